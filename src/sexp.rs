// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Canonical S-expression output for signature values.

External verification libraries in the libgcrypt family take signatures
as canonical S-expressions: `(sig-val (<algo> (s <value>)))` with every
token length-prefixed and the value kept as raw octets. The result is a
byte vector, not a string — signature octets are arbitrary binary.
*/

use crate::CmsError;

/// Map a signatureAlgorithm OID (content octets) to its S-expression
/// algorithm token.
fn algorithm_token(oid: &[u8]) -> Option<&'static str> {
    const PKCS1: &[u8] = &[42, 134, 72, 134, 247, 13, 1, 1];
    const X9_57_DSA: &[u8] = &[42, 134, 72, 206, 56, 4];
    const ANSI_X9_62_SIG: &[u8] = &[42, 134, 72, 206, 61, 4];

    // rsaEncryption and the <hash>WithRSAEncryption family.
    if oid.len() == PKCS1.len() + 1 && oid.starts_with(PKCS1) {
        return Some("rsa");
    }
    if oid.len() == X9_57_DSA.len() + 1 && oid.starts_with(X9_57_DSA) {
        return Some("dsa");
    }
    if oid.starts_with(ANSI_X9_62_SIG) {
        return Some("ecdsa");
    }

    None
}

/// Build `(sig-val (<algo> (s <signature>)))` in canonical form.
pub(crate) fn sig_val(algo_oid: &[u8], signature: &[u8]) -> Result<Vec<u8>, CmsError> {
    let token = algorithm_token(algo_oid).ok_or_else(|| {
        CmsError::UnknownSignatureAlgorithm(
            crate::oid::to_dotted(algo_oid).unwrap_or_else(|_| "invalid".into()),
        )
    })?;

    let mut out = Vec::with_capacity(signature.len() + 32);
    out.extend_from_slice(b"(7:sig-val(");
    out.extend_from_slice(format!("{}:{}", token.len(), token).as_bytes());
    out.extend_from_slice(b"(1:s");
    out.extend_from_slice(format!("{}:", signature.len()).as_bytes());
    out.extend_from_slice(signature);
    out.extend_from_slice(b")))");

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_family() {
        // rsaEncryption
        assert_eq!(
            algorithm_token(&[42, 134, 72, 134, 247, 13, 1, 1, 1]),
            Some("rsa")
        );
        // sha256WithRSAEncryption
        assert_eq!(
            algorithm_token(&[42, 134, 72, 134, 247, 13, 1, 1, 11]),
            Some("rsa")
        );
        // ecdsa-with-SHA256
        assert_eq!(
            algorithm_token(&[42, 134, 72, 206, 61, 4, 3, 2]),
            Some("ecdsa")
        );
        assert_eq!(algorithm_token(&[43, 14, 3, 2, 26]), None);
    }

    #[test]
    fn canonical_output() {
        let sexp = sig_val(&[42, 134, 72, 134, 247, 13, 1, 1, 1], b"\x01\x02\x03").unwrap();
        assert_eq!(sexp, b"(7:sig-val(3:rsa(1:s3:\x01\x02\x03)))".to_vec());
    }

    #[test]
    fn unknown_algorithm_errors() {
        assert!(sig_val(&[43, 14, 3, 2, 26], b"sig").is_err());
    }
}
