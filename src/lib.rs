// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Streaming Cryptographic Message Syntax (RFC 2630) in Pure Rust

This crate reads and writes CMS containers incrementally. Instead of
slurping a whole message into memory, the engine is a caller-pumped state
machine: every call to [`Cms::parse`] or [`Cms::build`] runs to the next
point where the caller has to act and returns a [`StopReason`] saying what
that action is — stream the payload through a hash function, supply a
message digest, supply a signature. This is the shape S/MIME-style
protocols want, where the payload can be large and the cryptographic
primitives live elsewhere.

Functionality includes:

* Parsing a signed-data container from any [`std::io::Read`], cooperating
  with a caller-supplied hash sink and preserving the byte-exact
  `signedAttrs` region needed for signature verification.
* Emitting a signed-data container to any [`std::io::Write`], with the
  caller providing the payload, the content digest and the raw signature
  at well-defined suspension points.
* Accessors over the parsed `SignerInfos`: issuer/serial, digest
  algorithm, `messageDigest` attribute, and the signature value as a
  canonical S-expression for an external verification library.

Hashing and signing are always delegated: the crate never computes a
digest or a signature itself.

# IMPORTANT SECURITY LIMITATIONS

This crate moves bytes and preserves the regions signatures are computed
over. It does not verify signatures, validate certificates, or judge the
strength of any algorithm involved. If you use it to process signed data
you need a real verification and trust layer on top.

# Technical Notes

RFC 2630 messages are BER, not DER: the outer wrappers are usually
indefinite-length with end-of-contents terminators, while the regions
covered by signatures (`signedAttrs`, the structures inside certificates)
are DER. The engine therefore mixes a small streaming tag-length reader
and writer for the outer framing with `bcder` for every tree-shaped
sub-structure. OpenSSL can be used to inspect the output:

   $ openssl asn1parse -inform DER -in <filename>
   $ openssl pkcs7 -inform DER -in <filename> -print
*/

pub mod asn1;
mod ber;
mod build;
mod certificate;
mod cms;
mod content;
mod dn;
mod oid;
mod parse;
mod sexp;
#[cfg(test)]
pub(crate) mod testutil;

pub use {
    certificate::Certificate,
    cms::Cms,
    content::{ContentType, StopReason},
};

use std::fmt::Display;

#[derive(Debug)]
pub enum CmsError {
    /// An argument was unusable (empty, out of bounds, wrong size).
    InvalidValue,

    /// A signer index referenced no signer.
    InvalidIndex,

    /// A reader or writer was already bound to the container.
    Conflict,

    /// The engine was re-entered while a step was still in progress, or a
    /// stop reason was observed that the current operation cannot accept.
    InvalidState,

    /// A prerequisite the caller must supply first is missing (reader,
    /// writer, content type, hash function).
    MissingAction,

    /// A required value is missing (no signers, no digest algorithms, a
    /// signer without digest or signature).
    MissingValue,

    /// An accessor was called before any parse or build produced data.
    NoData,

    /// A required element was absent from an otherwise valid structure.
    ValueNotFound,

    /// An element that must be unique occurred more than once.
    DuplicateValue,

    /// The requested operation is not implemented for this content type
    /// or signer index.
    NotImplemented,

    /// The outer content type OID is not in the dispatcher table.
    UnknownCmsObject(String),

    /// The content type is known but has no handler installed.
    UnsupportedCmsObject(String),

    /// The input is not a well-formed CMS structure.
    InvalidCmsObject(&'static str),

    /// The signatureAlgorithm OID has no S-expression mapping.
    UnknownSignatureAlgorithm(String),

    /// An OID string or encoding could not be converted.
    MalformedOid,

    /// An internal contract was violated. Not recoverable.
    Bug(&'static str),

    /// An error occurred decoding ASN.1 data.
    Decode(bcder::decode::Error),

    /// A general I/O error occurred on the reader or writer.
    Io(std::io::Error),

    /// Error decoding PEM data.
    Pem(pem::PemError),
}

impl std::error::Error for CmsError {}

impl Display for CmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue => f.write_str("invalid argument"),
            Self::InvalidIndex => f.write_str("invalid signer index"),
            Self::Conflict => f.write_str("reader or writer already bound"),
            Self::InvalidState => f.write_str("engine called in an invalid state"),
            Self::MissingAction => f.write_str("a required caller action has not happened"),
            Self::MissingValue => f.write_str("a required value is missing"),
            Self::NoData => f.write_str("no parsed or built data available"),
            Self::ValueNotFound => f.write_str("required element not found"),
            Self::DuplicateValue => f.write_str("duplicate element where uniqueness is required"),
            Self::NotImplemented => f.write_str("operation not implemented"),
            Self::UnknownCmsObject(oid) => {
                f.write_fmt(format_args!("unknown CMS content type: {}", oid))
            }
            Self::UnsupportedCmsObject(oid) => {
                f.write_fmt(format_args!("unsupported CMS content type: {}", oid))
            }
            Self::InvalidCmsObject(detail) => {
                f.write_fmt(format_args!("invalid CMS object: {}", detail))
            }
            Self::UnknownSignatureAlgorithm(oid) => {
                f.write_fmt(format_args!("unknown signature algorithm: {}", oid))
            }
            Self::MalformedOid => f.write_str("malformed object identifier"),
            Self::Bug(detail) => f.write_fmt(format_args!("internal error: {}", detail)),
            Self::Decode(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Pem(e) => f.write_fmt(format_args!("PEM error: {}", e)),
        }
    }
}

impl From<bcder::decode::Error> for CmsError {
    fn from(e: bcder::decode::Error) -> Self {
        Self::Decode(e)
    }
}

impl From<std::io::Error> for CmsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<pem::PemError> for CmsError {
    fn from(e: pem::PemError) -> Self {
        Self::Pem(e)
    }
}
