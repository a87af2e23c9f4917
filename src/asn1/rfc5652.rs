// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CMS structures from RFC 2630 and its successors.

These types cover the tree-shaped regions the engine hands to `bcder`:
the digest-algorithm set, the certificate set and the `SignerInfos`
block. The outer ContentInfo/SignedData framing never appears here — the
engine streams it header by header (see `crate::ber`) because it has to
suspend in the middle of it.

Regions that are later digested or embedded verbatim keep their raw
encodings next to the decoded values.
*/

use {
    crate::asn1::{rfc3280::Name, rfc5280},
    bcder::{
        decode::{Constructed, Malformed, Source, Unimplemented},
        encode,
        encode::PrimitiveContent,
        encode::Values,
        Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    std::{
        io::Write,
        ops::{Deref, DerefMut},
    },
};

/// The data content type.
///
/// 1.2.840.113549.1.7.1
pub const OID_ID_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// The signed-data content type.
///
/// 1.2.840.113549.1.7.2
pub const OID_ID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// Enveloped-data content type.
///
/// 1.2.840.113549.1.7.3
pub const OID_ENVELOPED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 3]);

/// Digested-data content type.
///
/// 1.2.840.113549.1.7.5
pub const OID_DIGESTED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 5]);

/// Encrypted-data content type.
///
/// 1.2.840.113549.1.7.6
pub const OID_ENCRYPTED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 6]);

/// Authenticated-data content type.
///
/// 1.2.840.113549.1.9.16.1.2
pub const OID_AUTHENTICATED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 1, 2]);

/// Identifies the message-digest attribute.
///
/// 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// ```ASN.1
/// DigestAlgorithmIdentifiers ::= SET OF DigestAlgorithmIdentifier
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DigestAlgorithmIdentifiers(Vec<DigestAlgorithmIdentifier>);

impl Deref for DigestAlgorithmIdentifiers {
    type Target = Vec<DigestAlgorithmIdentifier>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DigestAlgorithmIdentifiers {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl DigestAlgorithmIdentifiers {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        cons.take_set(|cons| {
            let mut identifiers = Vec::new();

            while let Some(identifier) = rfc5280::AlgorithmIdentifier::take_opt_from(cons)? {
                identifiers.push(identifier);
            }

            Ok(Self(identifiers))
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        encode::set(&self.0)
    }
}

pub type DigestAlgorithmIdentifier = rfc5280::AlgorithmIdentifier;

pub type SignatureAlgorithmIdentifier = rfc5280::AlgorithmIdentifier;

pub type SignatureValue = OctetString;

/// ```ASN.1
/// SignerInfos ::= SET OF SignerInfo
/// ```
#[derive(Clone, Debug, Default)]
pub struct SignerInfos(Vec<SignerInfo>);

impl Deref for SignerInfos {
    type Target = Vec<SignerInfo>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SignerInfos {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        cons.take_set(|cons| {
            let mut infos = Vec::new();

            while let Some(info) = SignerInfo::take_opt_from(cons)? {
                infos.push(info);
            }

            Ok(Self(infos))
        })
    }
}

/// ```ASN.1
/// SignerInfo ::= SEQUENCE {
///   version CMSVersion,
///   sid SignerIdentifier,
///   digestAlgorithm DigestAlgorithmIdentifier,
///   signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///   signatureAlgorithm SignatureAlgorithmIdentifier,
///   signature SignatureValue,
///   unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
///
/// Decode-only; the builder emits its SignerInfo encodings from raw
/// cached regions instead of going through this type.
#[derive(Clone, Debug)]
pub struct SignerInfo {
    pub version: CmsVersion,
    pub sid: SignerIdentifier,
    pub digest_algorithm: DigestAlgorithmIdentifier,
    pub signed_attributes: Option<SignedAttributes>,
    pub signature_algorithm: SignatureAlgorithmIdentifier,
    pub signature: SignatureValue,

    /// Raw bytes backing the signed attributes.
    ///
    /// Does not include the constructed tag or length octets.
    pub signed_attributes_data: Option<Vec<u8>>,
}

impl SignerInfo {
    pub fn take_opt_from<S: Source>(cons: &mut Constructed<S>) -> Result<Option<Self>, S::Err> {
        cons.take_opt_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn from_sequence<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        let version = CmsVersion::take_from(cons)?;
        let sid = SignerIdentifier::take_from(cons)?;
        let digest_algorithm = DigestAlgorithmIdentifier::take_from(cons)?;

        let signed_attributes = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
            // RFC 2630 section 11 requires the signed attributes to be DER
            // even inside a BER message, and their raw bytes feed the
            // signature hash. Keep a verbatim copy next to the parse.
            let der = cons.capture_all()?;
            let der_data = der.as_slice().to_vec();

            Ok((
                Constructed::decode(der.as_slice(), Mode::Der, |cons| {
                    SignedAttributes::take_from_set(cons)
                })?,
                der_data,
            ))
        })?;

        let (signed_attributes, signed_attributes_data) = match signed_attributes {
            Some((attrs, data)) => (Some(attrs), Some(data)),
            None => (None, None),
        };

        let signature_algorithm = SignatureAlgorithmIdentifier::take_from(cons)?;
        let signature = SignatureValue::take_from(cons)?;

        // Unsigned attributes have no consumer here; accept and drop them.
        cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.capture_all().map(|_| ()))?;

        Ok(Self {
            version,
            sid,
            digest_algorithm,
            signed_attributes,
            signature_algorithm,
            signature,
            signed_attributes_data,
        })
    }

    /// The bytes a verifier must digest for this signer's attributes.
    ///
    /// RFC 2630 section 5.4: the hash is computed over the EXPLICIT
    /// SET OF encoding, not the IMPLICIT `[0]` tag the attributes carry
    /// inside the message. So the stored raw attribute bytes get
    /// re-framed under a SET tag with a minimal DER length.
    pub fn signed_attributes_digested_content(
        &self,
    ) -> Result<Option<Vec<u8>>, std::io::Error> {
        let data = match &self.signed_attributes_data {
            Some(data) => data,
            None => return Ok(None),
        };

        let mut buffer = Vec::with_capacity(data.len() + 8);
        buffer.write_all(&[0x31])?;

        if data.len() < 0x80 {
            buffer.write_all(&[data.len() as u8])?;
        } else if data.len() < 0x100 {
            buffer.write_all(&[0x81, data.len() as u8])?;
        } else if data.len() < 0x10000 {
            buffer.write_all(&[0x82, (data.len() >> 8) as u8, data.len() as u8])?;
        } else if data.len() < 0x1000000 {
            buffer.write_all(&[
                0x83,
                (data.len() >> 16) as u8,
                (data.len() >> 8) as u8,
                data.len() as u8,
            ])?;
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "signed attributes length too long",
            ));
        }

        buffer.write_all(data)?;

        Ok(Some(buffer))
    }
}

/// ```ASN.1
/// SignerIdentifier ::= CHOICE {
///   issuerAndSerialNumber IssuerAndSerialNumber,
///   subjectKeyIdentifier [0] SubjectKeyIdentifier }
/// ```
#[derive(Clone, Debug)]
pub enum SignerIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),
    SubjectKeyIdentifier(Bytes),
}

impl SignerIdentifier {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        if let Some(identifier) =
            cons.take_opt_primitive_if(Tag::CTX_0, |prim| prim.take_all())?
        {
            Ok(Self::SubjectKeyIdentifier(identifier))
        } else {
            Ok(Self::IssuerAndSerialNumber(
                IssuerAndSerialNumber::take_from(cons)?,
            ))
        }
    }
}

/// ```ASN.1
/// IssuerAndSerialNumber ::= SEQUENCE {
///   issuer Name,
///   serialNumber CertificateSerialNumber }
/// ```
///
/// Both fields also keep their raw encodings: `get_issuer_serial` hands
/// the serial content octets out unchanged, and re-encoding a parsed
/// name is not guaranteed to be lossless for non-minimal input.
#[derive(Clone, Debug)]
pub struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: Integer,
    pub issuer_data: Vec<u8>,
    pub serial_data: Vec<u8>,
}

impl IssuerAndSerialNumber {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        cons.take_sequence(|cons| {
            let mut issuer = None;
            let issuer_captured = cons.capture(|cons| {
                issuer = Some(Name::take_from(cons)?);
                Ok(())
            })?;
            let issuer = match issuer {
                Some(issuer) => issuer,
                None => return Err(Malformed.into()),
            };

            let mut serial_number = None;
            let serial_captured = cons.capture(|cons| {
                serial_number = Some(Integer::take_from(cons)?);
                Ok(())
            })?;
            let serial_number = match serial_number {
                Some(serial_number) => serial_number,
                None => return Err(Malformed.into()),
            };

            Ok(Self {
                issuer,
                serial_number,
                issuer_data: issuer_captured.as_slice().to_vec(),
                serial_data: serial_captured.as_slice().to_vec(),
            })
        })
    }
}

/// ```ASN.1
/// SignedAttributes ::= SET SIZE (1..MAX) OF Attribute
/// ```
#[derive(Clone, Debug, Default)]
pub struct SignedAttributes(Vec<Attribute>);

impl Deref for SignedAttributes {
    type Target = Vec<Attribute>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SignedAttributes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl SignedAttributes {
    /// Read attributes from an already entered SET (or implicitly tagged
    /// equivalent).
    pub fn take_from_set<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        let mut attributes = Vec::new();

        while let Some(attribute) = Attribute::take_opt_from(cons)? {
            attributes.push(attribute);
        }

        Ok(Self(attributes))
    }

    pub fn encode_ref_as(&self, tag: Tag) -> impl Values + '_ {
        encode::set_as(tag, encode::slice(&self.0, |x| x.clone().encode()))
    }
}

/// ```ASN.1
/// Attribute ::= SEQUENCE {
///   attrType OBJECT IDENTIFIER,
///   attrValues SET OF AttributeValue }
/// ```
#[derive(Clone, Debug)]
pub struct Attribute {
    pub typ: Oid,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn take_opt_from<S: Source>(cons: &mut Constructed<S>) -> Result<Option<Self>, S::Err> {
        cons.take_opt_sequence(|cons| {
            let typ = Oid::take_from(cons)?;

            let values = cons.take_set(|cons| {
                let mut values = Vec::new();

                while let Some(value) = AttributeValue::take_opt_from(cons)? {
                    values.push(value);
                }

                Ok(values)
            })?;

            Ok(Self { typ, values })
        })
    }

    pub fn encode(self) -> impl Values {
        encode::sequence((self.typ.encode(), encode::set(self.values)))
    }
}

#[derive(Clone, Debug)]
pub struct AttributeValue(Captured);

impl AttributeValue {
    /// Construct a new instance from captured data.
    pub fn new(captured: Captured) -> Self {
        Self(captured)
    }

    pub fn take_opt_from<S: Source>(cons: &mut Constructed<S>) -> Result<Option<Self>, S::Err> {
        let captured = cons.capture_all()?;

        if captured.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Self(captured)))
        }
    }
}

impl Values for AttributeValue {
    fn encoded_len(&self, mode: Mode) -> usize {
        self.0.encoded_len(mode)
    }

    fn write_encoded<W: Write>(&self, mode: Mode, target: &mut W) -> Result<(), std::io::Error> {
        self.0.write_encoded(mode, target)
    }
}

impl Deref for AttributeValue {
    type Target = Captured;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// ```ASN.1
/// CertificateSet ::= SET OF CertificateChoices
/// ```
#[derive(Clone, Debug, Default)]
pub struct CertificateSet(Vec<CertificateChoices>);

impl Deref for CertificateSet {
    type Target = Vec<CertificateChoices>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CertificateSet {
    /// Read choices from an already entered set region.
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        let mut certs = Vec::new();

        while let Some(cert) = CertificateChoices::take_opt_from(cons)? {
            certs.push(cert);
        }

        Ok(Self(certs))
    }
}

/// ```ASN.1
/// CertificateChoices ::= CHOICE {
///   certificate Certificate,
///   extendedCertificate [0] IMPLICIT ExtendedCertificate, -- Obsolete
///   v1AttrCert [1] IMPLICIT AttributeCertificateV1,       -- Obsolete
///   v2AttrCert [2] IMPLICIT AttributeCertificateV2,
///   other [3] IMPLICIT OtherCertificateFormat }
/// ```
///
/// Only the plain certificate alternative is handled; attribute
/// certificates are out of scope for this engine.
#[derive(Clone, Debug)]
pub enum CertificateChoices {
    Certificate(Box<rfc5280::Certificate>),
}

impl CertificateChoices {
    pub fn take_opt_from<S: Source>(cons: &mut Constructed<S>) -> Result<Option<Self>, S::Err> {
        for tag in [Tag::CTX_0, Tag::CTX_1, Tag::CTX_2, Tag::CTX_3] {
            cons.take_opt_constructed_if(tag, |_cons| -> Result<(), S::Err> {
                Err(Unimplemented.into())
            })?;
        }

        match cons.take_opt_sequence(|cons| rfc5280::Certificate::from_sequence(cons))? {
            Some(cert) => Ok(Some(Self::Certificate(Box::new(cert)))),
            None => Ok(None),
        }
    }
}

/// ```ASN.1
/// CMSVersion ::= INTEGER
///                { v0(0), v1(1), v2(2), v3(3), v4(4), v5(5) }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmsVersion {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl CmsVersion {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        match cons.take_primitive_if(Tag::INTEGER, Integer::i8_from_primitive)? {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            _ => Err(Malformed.into()),
        }
    }
}

impl From<CmsVersion> for u8 {
    fn from(v: CmsVersion) -> u8 {
        v as u8
    }
}

/// Pre-encoded DER embedded verbatim into an enclosing encoder.
///
/// The builder uses this for the regions whose bytes are contractually
/// bit-exact copies: the signer's issuer and serial from the certificate
/// image, and the cached `signedAttrs` that the caller already hashed.
pub struct RawDer<'a>(pub &'a [u8]);

impl Values for RawDer<'_> {
    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.0)
    }
}
