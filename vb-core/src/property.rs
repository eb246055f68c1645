//! Chain object properties.
//!
//! Anything that travels on the wire or gets persisted implements
//! `Serialize`/`Deserialize` against `std::io` so that callers can
//! stream it; the canonical in-memory codec lives in `mempack`.

/// Serialize an object to a writer. The serialization must be
/// canonical: two equal objects produce the same bytes.
pub trait Serialize {
    type Error: std::error::Error + From<std::io::Error>;

    fn serialize<W: std::io::Write>(&self, writer: W) -> Result<(), Self::Error>;

    /// Convenience to serialize into a fresh byte vector
    fn serialize_as_vec(&self) -> Result<Vec<u8>, Self::Error> {
        let mut data = vec![];
        self.serialize(&mut data)?;
        Ok(data)
    }
}

/// Deserialize an object from a reader, the inverse of `Serialize`.
pub trait Deserialize: Sized {
    type Error: std::error::Error + From<std::io::Error>;

    fn deserialize<R: std::io::BufRead>(reader: R) -> Result<Self, Self::Error>;
}

impl<T: Serialize> Serialize for &T {
    type Error = T::Error;

    fn serialize<W: std::io::Write>(&self, writer: W) -> Result<(), T::Error> {
        (**self).serialize(writer)
    }
}

pub mod testing {
    use super::*;

    /// test that any arbitrary given object can serialize and deserialize
    /// back into itself (i.e. it is a bijection, or a one to one match
    /// between the serialized bytes and the object)
    pub fn serialization_bijection<T>(t: T) -> bool
    where
        T: Serialize + Deserialize + Eq,
    {
        let vec = match t.serialize_as_vec() {
            Err(_) => return false,
            Ok(v) => v,
        };
        let cursor = std::io::Cursor::new(vec);
        match T::deserialize(cursor) {
            Err(_) => false,
            Ok(decoded_t) => decoded_t == t,
        }
    }
}
