// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The content-type dispatcher and the stop-reason protocol.

Content types are enumerated in exactly one place: the handler table.
A row ties together the OID (string and DER forms), the [`ContentType`]
tag and the parse/build handlers. Adding a content type is adding a row.
*/

use {
    crate::{
        asn1::rfc5652::{
            OID_AUTHENTICATED_DATA, OID_DIGESTED_DATA, OID_ENCRYPTED_DATA, OID_ENVELOPED_DATA,
            OID_ID_DATA, OID_ID_SIGNED_DATA,
        },
        cms::Cms,
        CmsError,
    },
    bcder::ConstOid,
};

/// The CMS content types this crate knows about.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Data,
    SignedData,
    EnvelopedData,
    DigestedData,
    EncryptedData,
    AuthData,
}

/// Why the engine suspended and handed control back to the caller.
///
/// Every [`Cms::parse`] and [`Cms::build`] call runs until it needs the
/// caller to act, then returns one of these. The value also drives the
/// next call: the engine derives its internal state from the reason it
/// last stopped for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopReason {
    /// No engine step has run yet.
    None,

    /// A step is in progress. Observing this between calls means the
    /// previous step failed; the operation cannot be resumed.
    Running,

    /// The content type has been identified (parse) or accepted (build).
    GotContent,

    /// The container holds a detached signature; the caller may hash the
    /// external payload now or later.
    NeedHash,

    /// The encapsulated content starts here. On parse the next step
    /// streams it through the hash callback; on build the caller writes
    /// the payload now via [`Cms::write_data`].
    BeginData,

    /// The encapsulated content has ended.
    EndData,

    /// The signed attributes are cached; the caller must hash them and
    /// supply the resulting signature before the next step.
    NeedSig,

    /// The operation is complete.
    Ready,
}

pub(crate) type HandlerFn = fn(&mut Cms) -> Result<(), CmsError>;

pub(crate) struct ContentHandler {
    pub oid: &'static str,
    pub oid_der: ConstOid,
    pub ct: ContentType,
    pub parse: Option<HandlerFn>,
    pub build: Option<HandlerFn>,
}

pub(crate) static CONTENT_HANDLERS: &[ContentHandler] = &[
    ContentHandler {
        oid: "1.2.840.113549.1.7.1",
        oid_der: OID_ID_DATA,
        ct: ContentType::Data,
        parse: Some(ct_parse_data),
        build: Some(ct_build_data),
    },
    ContentHandler {
        oid: "1.2.840.113549.1.7.2",
        oid_der: OID_ID_SIGNED_DATA,
        ct: ContentType::SignedData,
        parse: Some(ct_parse_signed_data),
        build: Some(ct_build_signed_data),
    },
    ContentHandler {
        oid: "1.2.840.113549.1.7.3",
        oid_der: OID_ENVELOPED_DATA,
        ct: ContentType::EnvelopedData,
        parse: Some(ct_parse_enveloped_data),
        build: Some(ct_build_enveloped_data),
    },
    ContentHandler {
        oid: "1.2.840.113549.1.7.5",
        oid_der: OID_DIGESTED_DATA,
        ct: ContentType::DigestedData,
        parse: Some(ct_parse_digested_data),
        build: Some(ct_build_digested_data),
    },
    ContentHandler {
        oid: "1.2.840.113549.1.7.6",
        oid_der: OID_ENCRYPTED_DATA,
        ct: ContentType::EncryptedData,
        parse: Some(ct_parse_encrypted_data),
        build: Some(ct_build_encrypted_data),
    },
    ContentHandler {
        oid: "1.2.840.113549.1.9.16.1.2",
        oid_der: OID_AUTHENTICATED_DATA,
        ct: ContentType::AuthData,
        parse: None,
        build: None,
    },
];

/// Select a handler row by the DER content octets of its OID.
pub(crate) fn by_oid_der(content: &[u8]) -> Option<&'static ContentHandler> {
    CONTENT_HANDLERS.iter().find(|h| h.oid_der.0 == content)
}

/// Select a handler row by content type tag.
pub(crate) fn by_content_type(ct: ContentType) -> Option<&'static ContentHandler> {
    CONTENT_HANDLERS.iter().find(|h| h.ct == ct)
}

/// Select a handler row by dotted OID string.
pub(crate) fn by_oid_str(oid: &str) -> Option<&'static ContentHandler> {
    CONTENT_HANDLERS.iter().find(|h| h.oid == oid)
}

fn ct_parse_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_parse_signed_data(cms: &mut Cms) -> Result<(), CmsError> {
    crate::parse::signed_data(cms)
}

fn ct_parse_enveloped_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_parse_digested_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_parse_encrypted_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_build_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_build_signed_data(cms: &mut Cms) -> Result<(), CmsError> {
    crate::build::signed_data(cms)
}

fn ct_build_enveloped_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_build_digested_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

fn ct_build_encrypted_data(_cms: &mut Cms) -> Result<(), CmsError> {
    Err(CmsError::NotImplemented)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::oid};

    #[test]
    fn oid_forms_agree() {
        for handler in CONTENT_HANDLERS {
            let der = oid::from_dotted(handler.oid).unwrap();
            assert_eq!(der, handler.oid_der.0, "row {}", handler.oid);
            assert_eq!(by_oid_der(&der).unwrap().ct, handler.ct);
            assert_eq!(by_oid_str(handler.oid).unwrap().ct, handler.ct);
            assert_eq!(by_content_type(handler.ct).unwrap().oid, handler.oid);
        }
    }

    #[test]
    fn unknown_oid_misses() {
        assert!(by_oid_der(&oid::from_dotted("1.2.3.4").unwrap()).is_none());
        assert!(by_oid_str("1.2.3.4").is_none());
    }

    #[test]
    fn auth_data_declared_without_handlers() {
        let row = by_content_type(ContentType::AuthData).unwrap();
        assert!(row.parse.is_none());
        assert!(row.build.is_none());
    }
}
