// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The CMS container and its caller-facing surface. */

use {
    crate::{
        asn1::rfc5652::{SignedAttributes, SignerIdentifier, SignerInfos, OID_MESSAGE_DIGEST},
        ber::{self, BerReader},
        certificate::Certificate,
        content::{self, ContentHandler, ContentType, StopReason},
        dn, oid, parse, sexp, CmsError,
    },
    bcder::{decode::Constructed, Mode, OctetString},
    std::{
        io::{Read, Write},
        ops::Deref,
    },
};

/// Largest message digest a signer record accepts (SHA-512 sized).
const MAX_DIGEST_LEN: usize = 64;

/// One signer: an owned certificate, its content digest, and during a
/// build the cached `signedAttributes` and the caller's signature.
pub(crate) struct SignerRecord {
    /// `None` once the certificate was handed out via `get_cert`.
    pub cert: Option<Certificate>,
    pub msg_digest: Option<Vec<u8>>,
    pub attr: Option<SignedAttrCache>,
    pub sig_val: Option<SigVal>,
}

/// The DER image of one signer's `signedAttributes` together with the
/// attribute tree it was encoded from.
///
/// The image carries the IMPLICIT `[0]` tag under which the attributes
/// sit inside `SignerInfo`. It is the byte region the caller hashes (via
/// [`Cms::hash_signed_attrs`], re-tagged as a SET) and the byte region
/// embedded verbatim at the end of the build, which is exactly the
/// equality signature verification depends on.
pub(crate) struct SignedAttrCache {
    #[allow(dead_code)]
    pub root: SignedAttributes,
    pub image: Vec<u8>,
}

/// A caller-supplied signature with its algorithm OID.
pub(crate) struct SigVal {
    pub algorithm: String,
    pub value: Vec<u8>,
}

/// A parsed `SignerInfos` block and the byte image it was parsed from.
/// The two only exist together; the image is the verbatim wire region
/// in case a caller needs to re-emit or re-examine it.
pub(crate) struct SignerInfoSet {
    #[allow(dead_code)]
    pub image: Vec<u8>,
    pub infos: SignerInfos,
    pub cached_digest_algo: Option<String>,
}

impl SignerInfoSet {
    pub fn from_image(image: Vec<u8>) -> Result<Self, CmsError> {
        let infos = Constructed::decode(image.as_slice(), Mode::Ber, |cons| {
            SignerInfos::take_from(cons)
        })?;

        Ok(Self {
            image,
            infos,
            cached_digest_algo: None,
        })
    }
}

/// A CMS container.
///
/// The container owns everything it accumulates — content type, digest
/// algorithms, signer records, parsed signer infos — and borrows its
/// byte streams from the caller. Engine steps ([`Self::parse`],
/// [`Self::build`]) advance a stop-reason protocol; all other methods
/// are setters and accessors around that protocol.
pub struct Cms<'a> {
    pub(crate) reader: Option<BerReader<'a>>,
    pub(crate) writer: Option<&'a mut (dyn Write + 'a)>,
    pub(crate) stop_reason: StopReason,
    pub(crate) content: Option<&'static ContentHandler>,
    pub(crate) encap_cont_type: Option<String>,
    pub(crate) digest_algos: Vec<String>,
    pub(crate) cert_list: Vec<SignerRecord>,
    pub(crate) signer_info: Option<SignerInfoSet>,
    pub(crate) data_digest: Option<Vec<u8>>,
    pub(crate) detached_signature: bool,
    pub(crate) hash_fnc: Option<Box<dyn FnMut(&[u8]) + 'a>>,
    pub(crate) parse_state: Option<parse::SignedDataState>,
}

impl Default for Cms<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Cms<'a> {
    /// Create a new and empty CMS container.
    pub fn new() -> Self {
        Self {
            reader: None,
            writer: None,
            stop_reason: StopReason::None,
            content: None,
            encap_cont_type: None,
            digest_algos: Vec::new(),
            cert_list: Vec::new(),
            signer_info: None,
            data_digest: None,
            detached_signature: false,
            hash_fnc: None,
            parse_state: None,
        }
    }

    /// Bind the byte streams. Each direction can be bound exactly once
    /// for the lifetime of the container.
    pub fn set_reader_writer(
        &mut self,
        reader: Option<&'a mut (dyn Read + 'a)>,
        writer: Option<&'a mut (dyn Write + 'a)>,
    ) -> Result<(), CmsError> {
        if reader.is_none() && writer.is_none() {
            return Err(CmsError::InvalidValue);
        }
        if (reader.is_some() && self.reader.is_some())
            || (writer.is_some() && self.writer.is_some())
        {
            return Err(CmsError::Conflict);
        }

        if let Some(r) = reader {
            self.reader = Some(BerReader::new(r));
        }
        if let Some(w) = writer {
            self.writer = Some(w);
        }
        Ok(())
    }

    /// Register the hash sink the engine feeds content and attribute
    /// bytes into. The callback runs synchronously from within engine
    /// steps.
    pub fn set_hash_function(&mut self, hash_fnc: impl FnMut(&[u8]) + 'a) {
        self.hash_fnc = Some(Box::new(hash_fnc));
    }

    /// Advance a parse to its next stop reason.
    pub fn parse(&mut self) -> Result<StopReason, CmsError> {
        if self.stop_reason == StopReason::None {
            // Initial state: identify the content type.
            if self.reader.is_none() {
                return Err(CmsError::MissingAction);
            }
            parse::content_info(self)?;
            self.stop_reason = StopReason::GotContent;
        } else {
            let handler = self
                .content
                .ok_or(CmsError::Bug("no content handler installed"))?;
            let parse_fn = handler
                .parse
                .ok_or_else(|| CmsError::UnsupportedCmsObject(handler.oid.to_string()))?;
            parse_fn(self)?;
        }

        Ok(self.stop_reason)
    }

    /// Advance a build to its next stop reason.
    pub fn build(&mut self) -> Result<StopReason, CmsError> {
        if self.stop_reason == StopReason::None {
            // Initial state: everything the whole build needs must be
            // configured before the first byte is written.
            if self.writer.is_none() {
                return Err(CmsError::MissingAction);
            }
            match self.content {
                Some(handler) if handler.build.is_some() => {}
                _ => return Err(CmsError::MissingAction),
            }
            if self.encap_cont_type.is_none() {
                return Err(CmsError::MissingAction);
            }
            self.stop_reason = StopReason::GotContent;
        } else {
            let handler = self
                .content
                .ok_or(CmsError::Bug("no content handler installed"))?;
            let build_fn = handler
                .build
                .ok_or_else(|| CmsError::UnsupportedCmsObject(handler.oid.to_string()))?;
            build_fn(self)?;
        }

        Ok(self.stop_reason)
    }

    /// The content type. `what` 0 is the outer type, 1 the encapsulated
    /// inner type.
    pub fn get_content_type(&self, what: u8) -> Option<ContentType> {
        match what {
            0 => self.content.map(|h| h.ct),
            1 => self
                .encap_cont_type
                .as_deref()
                .and_then(content::by_oid_str)
                .map(|h| h.ct),
            _ => None,
        }
    }

    /// The content type OID in dotted-decimal form. `what` as in
    /// [`Self::get_content_type`].
    pub fn get_content_oid(&self, what: u8) -> Option<&str> {
        match what {
            0 => self.content.map(|h| h.oid),
            1 => self.encap_cont_type.as_deref(),
            _ => None,
        }
    }

    /// Select the content type for a build. This is the first step of
    /// creating a message.
    pub fn set_content_type(&mut self, what: u8, ct: ContentType) -> Result<(), CmsError> {
        if what > 1 {
            return Err(CmsError::InvalidValue);
        }

        let handler = content::by_content_type(ct)
            .ok_or_else(|| CmsError::UnknownCmsObject(format!("{:?}", ct)))?;
        if handler.build.is_none() {
            return Err(CmsError::UnsupportedCmsObject(handler.oid.to_string()));
        }

        if what == 0 {
            self.content = Some(handler);
        } else {
            self.encap_cont_type = Some(handler.oid.to_string());
        }
        Ok(())
    }

    /// Register a digest algorithm by dotted OID. Algorithms are
    /// consumed in registration order, one per signer.
    pub fn add_digest_algo(&mut self, algo_oid: &str) -> Result<(), CmsError> {
        oid::from_dotted(algo_oid)?;
        self.digest_algos.push(algo_oid.to_string());
        Ok(())
    }

    /// Enumerate the registered digest algorithms.
    pub fn get_digest_algo_list(&self, idx: usize) -> Option<&str> {
        self.digest_algos.get(idx).map(String::as_str)
    }

    /// Add a signer. Ownership of the certificate transfers to the
    /// container; it comes back out (once) through [`Self::get_cert`].
    pub fn add_signer(&mut self, cert: Certificate) {
        self.cert_list.push(SignerRecord {
            cert: Some(cert),
            msg_digest: None,
            attr: None,
            sig_val: None,
        });
    }

    /// Store the content digest for signer `idx`. Must happen before the
    /// build step that emits the signed attributes.
    pub fn set_message_digest(&mut self, idx: usize, digest: &[u8]) -> Result<(), CmsError> {
        if digest.is_empty() || digest.len() > MAX_DIGEST_LEN {
            return Err(CmsError::InvalidValue);
        }
        let record = self.cert_list.get_mut(idx).ok_or(CmsError::InvalidIndex)?;
        record.msg_digest = Some(digest.to_vec());
        Ok(())
    }

    /// Store the signature for signer `idx`: the signature algorithm as
    /// a dotted OID plus the raw signature octets. Expected between the
    /// `NeedSig` stop and the final build step.
    pub fn set_sig_val(
        &mut self,
        idx: usize,
        algo_oid: &str,
        value: &[u8],
    ) -> Result<(), CmsError> {
        if value.is_empty() {
            return Err(CmsError::InvalidValue);
        }
        oid::from_dotted(algo_oid)?;
        let record = self.cert_list.get_mut(idx).ok_or(CmsError::InvalidIndex)?;
        record.sig_val = Some(SigVal {
            algorithm: algo_oid.to_string(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Write a chunk of the encapsulated payload during a build.
    ///
    /// Only valid while the build is suspended at
    /// [`StopReason::BeginData`]; each chunk becomes one OCTET STRING
    /// segment of the encapsulated content. Hashing the chunk is the
    /// caller's business.
    pub fn write_data(&mut self, data: &[u8]) -> Result<(), CmsError> {
        if self.stop_reason != StopReason::BeginData {
            return Err(CmsError::InvalidState);
        }
        let writer = self.writer.as_mut().ok_or(CmsError::MissingAction)?;
        ber::write_octet_string(writer, data)
    }

    /// Feed the signed attributes of signer `idx` to the hash callback.
    ///
    /// The attributes appear under an IMPLICIT `[0]` tag inside the
    /// message, but RFC 2630 section 5.4 requires the digest over their
    /// EXPLICIT SET OF encoding, so the region is fed with its first
    /// byte replaced by the SET tag.
    pub fn hash_signed_attrs(&mut self, idx: usize) -> Result<(), CmsError> {
        if self.hash_fnc.is_none() {
            return Err(CmsError::MissingAction);
        }

        let buffer = if let Some(set) = &self.signer_info {
            let info = set.infos.get(idx).ok_or(CmsError::ValueNotFound)?;
            info.signed_attributes_digested_content()?
                .ok_or(CmsError::ValueNotFound)?
        } else {
            let record = self.cert_list.get(idx).ok_or(CmsError::InvalidIndex)?;
            let attr = record.attr.as_ref().ok_or(CmsError::ValueNotFound)?;
            if attr.image.is_empty() {
                return Err(CmsError::Bug("empty signed attribute image"));
            }
            let mut buffer = Vec::with_capacity(attr.image.len());
            buffer.push(0x31);
            buffer.extend_from_slice(&attr.image[1..]);
            buffer
        };

        let hash_fnc = self.hash_fnc.as_mut().ok_or(CmsError::MissingAction)?;
        hash_fnc(&buffer);
        Ok(())
    }

    /// The issuer (RFC 2253 string) and serial number of signer `idx`.
    ///
    /// The serial is returned as the raw INTEGER content octets prefixed
    /// with their length as a 4 byte big-endian count.
    pub fn get_issuer_serial(&self, idx: usize) -> Result<(String, Vec<u8>), CmsError> {
        if idx > 0 {
            return Err(CmsError::NotImplemented);
        }
        let set = self.signer_info.as_ref().ok_or(CmsError::NoData)?;
        let info = set.infos.get(idx).ok_or(CmsError::ValueNotFound)?;

        let ias = match &info.sid {
            SignerIdentifier::IssuerAndSerialNumber(ias) => ias,
            SignerIdentifier::SubjectKeyIdentifier(_) => {
                log::warn!("signer {} is identified by subjectKeyIdentifier", idx);
                return Err(CmsError::NotImplemented);
            }
        };

        // Assemble both parts before returning either.
        let issuer = dn::to_rfc2253(&ias.issuer)?;
        let (_, content) = ber::split_tlv(&ias.serial_data)?;
        let mut serial = Vec::with_capacity(content.len() + 4);
        serial.extend_from_slice(&(content.len() as u32).to_be_bytes());
        serial.extend_from_slice(content);

        Ok((issuer, serial))
    }

    /// The digest algorithm signer `idx` actually signed with, as a
    /// dotted OID. The result is computed once and cached on the
    /// container.
    pub fn get_digest_algo(&mut self, idx: usize) -> Result<&str, CmsError> {
        if idx > 0 {
            return Err(CmsError::NotImplemented);
        }
        let set = self.signer_info.as_mut().ok_or(CmsError::NoData)?;

        if set.cached_digest_algo.is_none() {
            let info = set.infos.get(idx).ok_or(CmsError::ValueNotFound)?;
            let algo = oid::to_dotted(info.digest_algorithm.algorithm.0.as_ref())?;
            set.cached_digest_algo = Some(algo);
        }

        match &set.cached_digest_algo {
            Some(algo) => Ok(algo),
            None => Err(CmsError::Bug("digest algorithm cache not filled")),
        }
    }

    /// The `messageDigest` signed attribute of signer `idx`.
    ///
    /// `Ok(None)` when the signer carries no signed attributes at all
    /// (the element is optional). An attribute set without exactly one
    /// well-formed `messageDigest` is an error.
    pub fn get_message_digest(&self, idx: usize) -> Result<Option<Vec<u8>>, CmsError> {
        if idx > 0 {
            return Err(CmsError::NotImplemented);
        }
        let set = self.signer_info.as_ref().ok_or(CmsError::NoData)?;
        let info = set.infos.get(idx).ok_or(CmsError::ValueNotFound)?;

        let attrs = match &info.signed_attributes {
            Some(attrs) => attrs,
            None => return Ok(None),
        };

        let mut found = None;
        for attr in attrs.iter() {
            if attr.typ == OID_MESSAGE_DIGEST {
                if found.is_some() {
                    return Err(CmsError::DuplicateValue);
                }
                found = Some(attr);
            }
        }
        let attr = found.ok_or(CmsError::ValueNotFound)?;

        // The value is a SET OF OCTET STRING that must hold exactly one
        // string (RFC 2630 section 11.2).
        if attr.values.len() != 1 {
            return Err(CmsError::InvalidCmsObject(
                "messageDigest attribute must hold exactly one value",
            ));
        }
        let digest = attr.values[0]
            .deref()
            .clone()
            .decode(|cons| OctetString::take_from(cons))
            .map_err(|_| {
                CmsError::InvalidCmsObject("messageDigest value is not an OCTET STRING")
            })?;

        Ok(Some(digest.to_bytes().to_vec()))
    }

    /// The signature of signer `idx` as a canonical S-expression suited
    /// for an external verification library.
    pub fn get_sig_val(&self, idx: usize) -> Result<Vec<u8>, CmsError> {
        if idx > 0 {
            return Err(CmsError::NotImplemented);
        }
        let set = self.signer_info.as_ref().ok_or(CmsError::NoData)?;
        let info = set.infos.get(idx).ok_or(CmsError::ValueNotFound)?;

        sexp::sig_val(
            info.signature_algorithm.algorithm.0.as_ref(),
            info.signature.to_bytes().as_ref(),
        )
    }

    /// Take the certificate at `idx` out of the container.
    ///
    /// Ownership moves to the caller, so each certificate is returned
    /// exactly once; later calls with the same index yield `None`.
    pub fn get_cert(&mut self, idx: usize) -> Option<Certificate> {
        self.cert_list.get_mut(idx)?.cert.take()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            asn1::{
                rfc5280::AlgorithmIdentifier,
                rfc5652::{Attribute, AttributeValue, RawDer, OID_MESSAGE_DIGEST},
            },
            testutil,
        },
        bcder::{
            encode,
            encode::{PrimitiveContent, Values},
            Captured, Oid, Tag,
        },
        bytes::Bytes,
        std::io::{Read, Write},
    };

    #[test]
    fn reader_writer_bind_once() {
        let mut input: &[u8] = &[];
        let reader: &mut dyn Read = &mut input;
        let mut other_input: &[u8] = &[];
        let other_reader: &mut dyn Read = &mut other_input;
        let mut output = Vec::new();
        let writer: &mut dyn Write = &mut output;

        let mut cms = Cms::new();
        assert!(matches!(
            cms.set_reader_writer(None, None),
            Err(CmsError::InvalidValue)
        ));

        cms.set_reader_writer(Some(reader), None).unwrap();
        assert!(matches!(
            cms.set_reader_writer(Some(other_reader), None),
            Err(CmsError::Conflict)
        ));

        // The free direction can still be bound.
        cms.set_reader_writer(None, Some(writer)).unwrap();
    }

    #[test]
    fn get_cert_is_a_destructive_read() {
        let mut cms = Cms::new();
        cms.add_signer(testutil::test_cert());

        assert!(cms.get_cert(0).is_some());
        assert!(cms.get_cert(0).is_none());
        assert!(cms.get_cert(1).is_none());
    }

    #[test]
    fn message_digest_bounds() {
        let mut cms = Cms::new();
        cms.add_signer(testutil::test_cert());

        assert!(matches!(
            cms.set_message_digest(0, &[]),
            Err(CmsError::InvalidValue)
        ));
        assert!(matches!(
            cms.set_message_digest(0, &[0u8; 65]),
            Err(CmsError::InvalidValue)
        ));
        assert!(matches!(
            cms.set_message_digest(1, &[0u8; 20]),
            Err(CmsError::InvalidIndex)
        ));
        cms.set_message_digest(0, &[0u8; 20]).unwrap();
    }

    #[test]
    fn sig_val_setter_validates() {
        let mut cms = Cms::new();
        cms.add_signer(testutil::test_cert());

        assert!(matches!(
            cms.set_sig_val(0, "1.2.840.113549.1.1.1", &[]),
            Err(CmsError::InvalidValue)
        ));
        assert!(matches!(
            cms.set_sig_val(0, "not.an.oid", &[1]),
            Err(CmsError::MalformedOid)
        ));
        assert!(matches!(
            cms.set_sig_val(1, "1.2.840.113549.1.1.1", &[1]),
            Err(CmsError::InvalidIndex)
        ));
        cms.set_sig_val(0, "1.2.840.113549.1.1.1", &[1]).unwrap();
    }

    #[test]
    fn content_type_selection() {
        let mut cms = Cms::new();
        assert_eq!(cms.get_content_type(0), None);
        assert_eq!(cms.get_content_oid(1), None);

        assert!(matches!(
            cms.set_content_type(2, ContentType::SignedData),
            Err(CmsError::InvalidValue)
        ));
        assert!(matches!(
            cms.set_content_type(0, ContentType::AuthData),
            Err(CmsError::UnsupportedCmsObject(_))
        ));

        cms.set_content_type(0, ContentType::SignedData).unwrap();
        cms.set_content_type(1, ContentType::Data).unwrap();
        assert_eq!(cms.get_content_type(0), Some(ContentType::SignedData));
        assert_eq!(cms.get_content_oid(0), Some("1.2.840.113549.1.7.2"));
        assert_eq!(cms.get_content_type(1), Some(ContentType::Data));
        assert_eq!(cms.get_content_oid(1), Some("1.2.840.113549.1.7.1"));
    }

    #[test]
    fn digest_algo_list_is_ordered() {
        let mut cms = Cms::new();
        assert!(matches!(
            cms.add_digest_algo("bogus"),
            Err(CmsError::MalformedOid)
        ));
        cms.add_digest_algo("1.3.14.3.2.26").unwrap();
        cms.add_digest_algo("2.16.840.1.101.3.4.2.1").unwrap();

        assert_eq!(cms.get_digest_algo_list(0), Some("1.3.14.3.2.26"));
        assert_eq!(cms.get_digest_algo_list(1), Some("2.16.840.1.101.3.4.2.1"));
        assert_eq!(cms.get_digest_algo_list(2), None);
    }

    #[test]
    fn hash_signed_attrs_needs_a_hash_function() {
        let mut cms = Cms::new();
        assert!(matches!(
            cms.hash_signed_attrs(0),
            Err(CmsError::MissingAction)
        ));
    }

    #[test]
    fn accessors_without_data() {
        let mut cms = Cms::new();
        assert!(matches!(cms.get_issuer_serial(0), Err(CmsError::NoData)));
        assert!(matches!(cms.get_digest_algo(0), Err(CmsError::NoData)));
        assert!(matches!(cms.get_message_digest(0), Err(CmsError::NoData)));
        assert!(matches!(cms.get_sig_val(0), Err(CmsError::NoData)));
        assert!(matches!(
            cms.get_issuer_serial(1),
            Err(CmsError::NotImplemented)
        ));
    }

    fn octet_string_value(data: &[u8]) -> AttributeValue {
        AttributeValue::new(Captured::from_values(Mode::Der, data.encode()))
    }

    /// Render a single-signer SignerInfos image with the given signed
    /// attributes (or none).
    fn signer_infos_image(attributes: Option<Vec<Attribute>>) -> Vec<u8> {
        let cert = testutil::test_cert();
        let algorithm = AlgorithmIdentifier::with_null_parameters(Oid(Bytes::copy_from_slice(
            &crate::oid::from_dotted("1.3.14.3.2.26").unwrap(),
        )));

        let attr_image = attributes.map(|attrs| {
            let mut set = SignedAttributes::default();
            set.extend(attrs);
            let mut image = Vec::new();
            set.encode_ref_as(Tag::CTX_0)
                .write_encoded(Mode::Der, &mut image)
                .unwrap();
            image
        });

        let signer_info = encode::sequence((
            1u8.encode(),
            encode::sequence((
                RawDer(cert.issuer_data()),
                RawDer(cert.serial_data()),
            )),
            algorithm.encode_ref(),
            attr_image.as_deref().map(RawDer),
            algorithm.encode_ref(),
            b"sig".as_slice().encode(),
        ));

        Captured::from_values(Mode::Der, encode::set(signer_info))
            .as_slice()
            .to_vec()
    }

    fn with_signer_infos(image: Vec<u8>) -> Cms<'static> {
        let mut cms = Cms::new();
        cms.signer_info = Some(SignerInfoSet::from_image(image).unwrap());
        cms
    }

    fn message_digest_attr(values: Vec<AttributeValue>) -> Attribute {
        Attribute {
            typ: Oid(Bytes::copy_from_slice(OID_MESSAGE_DIGEST.as_ref())),
            values,
        }
    }

    #[test]
    fn message_digest_attribute_found() {
        let attr = message_digest_attr(vec![octet_string_value(b"01234567890123456789")]);
        let cms = with_signer_infos(signer_infos_image(Some(vec![attr])));
        assert_eq!(
            cms.get_message_digest(0).unwrap().unwrap(),
            b"01234567890123456789"
        );
    }

    #[test]
    fn duplicate_message_digest_attribute() {
        let attrs = vec![
            message_digest_attr(vec![octet_string_value(b"one")]),
            message_digest_attr(vec![octet_string_value(b"two")]),
        ];
        let cms = with_signer_infos(signer_infos_image(Some(attrs)));
        assert!(matches!(
            cms.get_message_digest(0),
            Err(CmsError::DuplicateValue)
        ));
    }

    #[test]
    fn message_digest_with_two_values_is_invalid() {
        let attr = message_digest_attr(vec![
            octet_string_value(b"one"),
            octet_string_value(b"two"),
        ]);
        let cms = with_signer_infos(signer_infos_image(Some(vec![attr])));
        assert!(matches!(
            cms.get_message_digest(0),
            Err(CmsError::InvalidCmsObject(_))
        ));
    }

    #[test]
    fn message_digest_must_be_an_octet_string() {
        let attr = message_digest_attr(vec![AttributeValue::new(Captured::from_values(
            Mode::Der,
            7u8.encode(),
        ))]);
        let cms = with_signer_infos(signer_infos_image(Some(vec![attr])));
        assert!(matches!(
            cms.get_message_digest(0),
            Err(CmsError::InvalidCmsObject(_))
        ));
    }

    #[test]
    fn message_digest_absent_from_attributes() {
        let other = Attribute {
            // content-type attribute; present but irrelevant here.
            typ: Oid(Bytes::copy_from_slice(&[42, 134, 72, 134, 247, 13, 1, 9, 3])),
            values: vec![octet_string_value(b"x")],
        };
        let cms = with_signer_infos(signer_infos_image(Some(vec![other])));
        assert!(matches!(
            cms.get_message_digest(0),
            Err(CmsError::ValueNotFound)
        ));
    }

    #[test]
    fn no_signed_attributes_at_all() {
        let cms = with_signer_infos(signer_infos_image(None));
        assert_eq!(cms.get_message_digest(0).unwrap(), None);
    }
}
