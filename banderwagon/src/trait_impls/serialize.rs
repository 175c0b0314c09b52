//! Arkworks (de)serialization for [`Element`], delegating to the canonical
//! 32-byte encoding. Compressed and uncompressed modes are identical.

use crate::Element;
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Valid, Validate,
    Write,
};

impl CanonicalSerialize for Element {
    fn serialize_with_mode<W: Write>(
        &self,
        mut writer: W,
        _compress: Compress,
    ) -> Result<(), SerializationError> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    fn serialized_size(&self, _compress: Compress) -> usize {
        Element::compressed_serialized_size()
    }
}

impl Valid for Element {
    fn check(&self) -> Result<(), SerializationError> {
        if self.subgroup_check() {
            Ok(())
        } else {
            Err(SerializationError::InvalidData)
        }
    }
}

impl CanonicalDeserialize for Element {
    fn deserialize_with_mode<R: Read>(
        mut reader: R,
        _compress: Compress,
        validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        let element = match validate {
            Validate::Yes => Element::from_bytes(&bytes),
            Validate::No => Element::from_bytes_unchecked(&bytes),
        };
        element.ok_or(SerializationError::InvalidData)
    }
}
