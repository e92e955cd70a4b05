//! Digest and encoding functions over string parameters

use base64::Engine;
use md5::Md5;
use serde_json::Value;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::{FunctionCall, FunctionError, FunctionExecutor};
use crate::deploy::BlueprintDeployContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    pub fn kind(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    /// Lowercase hex digest
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => format!("{:x}", Md5::digest(data)),
            DigestAlgorithm::Sha1 => format!("{:x}", Sha1::digest(data)),
            DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(data)),
        }
    }
}

/// `md5(text)`, `sha1(text)` and `sha256(text)`
pub struct DigestFunction {
    algorithm: DigestAlgorithm,
}

impl DigestFunction {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }
}

impl FunctionExecutor for DigestFunction {
    fn kind(&self) -> &'static str {
        self.algorithm.kind()
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        let text: String = call.required(0)?;
        Ok(Some(Value::String(
            self.algorithm.hex_digest(text.as_bytes()),
        )))
    }
}

/// `base64(text)`: standard alphabet with padding
pub struct Base64Function;

impl FunctionExecutor for Base64Function {
    fn kind(&self) -> &'static str {
        "base64"
    }

    fn execute(
        &self,
        call: &FunctionCall<'_>,
        _ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError> {
        let text: String = call.required(0)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        Ok(Some(Value::String(encoded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_digests() {
        let data = b"hello world";
        assert_eq!(
            DigestAlgorithm::Md5.hex_digest(data),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
        assert_eq!(
            DigestAlgorithm::Sha1.hex_digest(data),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            DigestAlgorithm::Sha256.hex_digest(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(DigestFunction::new(DigestAlgorithm::Sha1).kind(), "sha1");
        assert_eq!(Base64Function.kind(), "base64");
    }
}
