// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The signed-data build state machine.

Emission is strictly staged: the header down to the encapsulated
content, then (after the caller streamed the payload) the cached signed
attributes, then — once the caller supplied the signature — the
`SignerInfos` set and the closing end-of-contents octets. The outer
wrappers are indefinite-length so no stage needs to know the size of a
later one.
*/

use {
    crate::{
        asn1::{
            rfc5280::AlgorithmIdentifier,
            rfc5652::{
                Attribute, AttributeValue, DigestAlgorithmIdentifiers, RawDer, SignedAttributes,
                OID_MESSAGE_DIGEST,
            },
        },
        ber,
        cms::{Cms, SignedAttrCache, SignerInfoSet},
        content::StopReason,
        oid, CmsError,
    },
    bcder::{
        encode,
        encode::{PrimitiveContent, Values},
        Captured, Mode, Oid, Tag,
    },
    bytes::Bytes,
};

/// The signed-data build handler. Derives its internal state from the
/// reason the engine last stopped, performs one stage, and stores the
/// next stop reason.
pub(crate) fn signed_data(cms: &mut Cms) -> Result<(), CmsError> {
    enum State {
        Start,
        DataReady,
        GotSig,
    }

    let stop_reason = cms.stop_reason;
    cms.stop_reason = StopReason::Running;

    let state = match stop_reason {
        StopReason::GotContent => State::Start,
        StopReason::BeginData | StopReason::EndData => State::DataReady,
        StopReason::NeedSig => State::GotSig,
        StopReason::Running => return Err(CmsError::InvalidState),
        _ => return Err(CmsError::Bug("impossible stop reason in signed-data builder")),
    };

    match state {
        State::Start => {
            // A signer arriving with a preset digest means the payload
            // stays outside the message.
            cms.detached_signature = cms
                .cert_list
                .iter()
                .any(|record| record.msg_digest.is_some());
            write_header(cms)?;
        }
        State::DataReady => write_attributes(cms)?,
        State::GotSig => write_signer_infos(cms)?,
    }

    cms.stop_reason = match state {
        State::Start => {
            if cms.detached_signature {
                StopReason::EndData
            } else {
                StopReason::BeginData
            }
        }
        State::DataReady => StopReason::NeedSig,
        State::GotSig => StopReason::Ready,
    };
    Ok(())
}

/// START: everything up to the point where the caller writes the
/// encapsulated payload.
fn write_header(cms: &mut Cms) -> Result<(), CmsError> {
    let content_oid = cms
        .content
        .ok_or(CmsError::Bug("no content handler installed"))?
        .oid;
    let encap_oid = cms
        .encap_cont_type
        .as_deref()
        .ok_or(CmsError::MissingAction)?;
    let content_oid = oid::from_dotted(content_oid)?;
    let encap_oid = oid::from_dotted(encap_oid)?;
    let detached = cms.detached_signature;

    // The digest algorithm set is definite-length; render it first.
    let mut identifiers = DigestAlgorithmIdentifiers::default();
    for algo in &cms.digest_algos {
        identifiers.push(AlgorithmIdentifier::with_null_parameters(Oid(Bytes::from(
            oid::from_dotted(algo)?,
        ))));
    }
    let digest_set = Captured::from_values(Mode::Der, identifiers.encode_ref());

    let writer = cms.writer.as_mut().ok_or(CmsError::MissingAction)?;

    // Outer ContentInfo.
    ber::write_header(writer, ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE, None)?;
    ber::write_oid(writer, &content_oid)?;
    ber::write_header(writer, ber::CLASS_CONTEXT, true, 0, None)?;

    // The signed-data SEQUENCE itself.
    ber::write_header(writer, ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE, None)?;

    // CMSVersion. Always 3.
    ber::write_header(writer, ber::CLASS_UNIVERSAL, false, ber::TAG_INTEGER, Some(1))?;
    writer.write_all(&[0x03])?;

    writer.write_all(digest_set.as_slice())?;

    // The inner encapContentInfo.
    ber::write_header(writer, ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE, None)?;
    ber::write_oid(writer, &encap_oid)?;

    if !detached {
        // The [0] wrapper and a constructed OCTET STRING whose segments
        // the caller contributes through write_data.
        ber::write_header(writer, ber::CLASS_CONTEXT, true, 0, None)?;
        ber::write_header(
            writer,
            ber::CLASS_UNIVERSAL,
            true,
            ber::TAG_OCTET_STRING,
            None,
        )?;
    }
    Ok(())
}

/// DATAREADY: terminate the encapsulated content and cache each
/// signer's `signedAttributes` so the caller can hash them.
fn write_attributes(cms: &mut Cms) -> Result<(), CmsError> {
    {
        let writer = cms.writer.as_mut().ok_or(CmsError::MissingAction)?;
        if cms.detached_signature {
            // encapContentInfo
            ber::write_end_of_contents(writer)?;
        } else {
            // octet string, [0] wrapper, encapContentInfo
            ber::write_end_of_contents(writer)?;
            ber::write_end_of_contents(writer)?;
            ber::write_end_of_contents(writer)?;
        }
    }

    if cms.cert_list.is_empty() {
        return Err(CmsError::MissingValue);
    }
    if cms.digest_algos.is_empty() {
        return Err(CmsError::MissingValue);
    }

    for record in cms.cert_list.iter_mut() {
        if record.cert.is_none() {
            return Err(CmsError::Bug("signer without certificate"));
        }
        let digest = record.msg_digest.as_deref().ok_or(CmsError::MissingValue)?;

        let mut attributes = SignedAttributes::default();
        attributes.push(Attribute {
            typ: Oid(Bytes::copy_from_slice(OID_MESSAGE_DIGEST.as_ref())),
            values: vec![AttributeValue::new(Captured::from_values(
                Mode::Der,
                digest.encode(),
            ))],
        });

        // The image carries the IMPLICIT [0] tag it will be embedded
        // under. hash_signed_attrs re-frames the same bytes as a SET.
        let mut image = Vec::new();
        attributes
            .encode_ref_as(Tag::CTX_0)
            .write_encoded(Mode::Der, &mut image)?;

        record.attr = Some(SignedAttrCache {
            root: attributes,
            image,
        });
    }
    Ok(())
}

/// GOTSIG: emit one SignerInfo per signer inside a SET, then close the
/// remaining wrappers.
fn write_signer_infos(cms: &mut Cms) -> Result<(), CmsError> {
    if cms.cert_list.is_empty() {
        return Err(CmsError::MissingValue);
    }
    if cms.digest_algos.is_empty() {
        return Err(CmsError::MissingValue);
    }

    let mut images = Vec::with_capacity(cms.cert_list.len());
    for (signer, record) in cms.cert_list.iter().enumerate() {
        let digest_algo = cms
            .digest_algos
            .get(signer)
            .ok_or(CmsError::MissingValue)?;
        let cert = record
            .cert
            .as_ref()
            .ok_or(CmsError::Bug("signer without certificate"))?;
        let attr = record
            .attr
            .as_ref()
            .ok_or(CmsError::Bug("signed attributes not cached"))?;
        let sig = record.sig_val.as_ref().ok_or(CmsError::MissingValue)?;

        let digest_algorithm = AlgorithmIdentifier::with_null_parameters(Oid(Bytes::from(
            oid::from_dotted(digest_algo)?,
        )));
        let signature_algorithm = AlgorithmIdentifier::with_null_parameters(Oid(Bytes::from(
            oid::from_dotted(&sig.algorithm)?,
        )));

        // version 1: the signer is identified by issuer and serial,
        // copied bit-exact from the certificate image. The cached
        // attribute region goes in unchanged as well; re-encoding it
        // would break the signature the caller just computed.
        let signer_info = encode::sequence((
            1u8.encode(),
            encode::sequence((
                RawDer(cert.issuer_data()),
                RawDer(cert.serial_data()),
            )),
            digest_algorithm.encode_ref(),
            RawDer(&attr.image),
            signature_algorithm.encode_ref(),
            sig.value.as_slice().encode(),
        ));

        let mut image = Vec::new();
        signer_info.write_encoded(Mode::Der, &mut image)?;
        images.push(image);
    }

    let image_refs: Vec<RawDer> = images.iter().map(|image| RawDer(image.as_slice())).collect();
    let set_image = Captured::from_values(
        Mode::Der,
        encode::set(encode::slice(&image_refs, |image| RawDer(image.0))),
    );

    {
        let writer = cms.writer.as_mut().ok_or(CmsError::MissingAction)?;
        writer.write_all(set_image.as_slice())?;

        // signed-data SEQUENCE, its [0] wrapper, outer ContentInfo.
        ber::write_end_of_contents(writer)?;
        ber::write_end_of_contents(writer)?;
        ber::write_end_of_contents(writer)?;
    }

    // Keep the emitted set on the container so the accessors answer
    // against what was just written.
    let set = SignerInfoSet::from_image(set_image.as_slice().to_vec()).map_err(|e| {
        log::warn!("emitted SignerInfos does not re-parse: {}", e);
        CmsError::Bug("emitted SignerInfos does not re-parse")
    })?;
    cms.signer_info = Some(set);
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{testutil, Cms, CmsError, ContentType, StopReason},
        std::{cell::RefCell, io::Read, rc::Rc},
    };

    const OID_SHA1: &str = "1.3.14.3.2.26";
    const OID_RSA: &str = "1.2.840.113549.1.1.1";

    fn sha1(data: &[u8]) -> Vec<u8> {
        ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, data)
            .as_ref()
            .to_vec()
    }

    /// Drive a complete attached build and return the emitted container.
    fn build_attached(payload: &[u8], signature: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let cert = testutil::test_cert();
        let digest = sha1(payload);
        let hashed = Rc::new(RefCell::new(Vec::new()));

        let mut output = Vec::new();
        {
            let mut cms = Cms::new();
            cms.set_reader_writer(None, Some(&mut output)).unwrap();
            cms.set_content_type(0, ContentType::SignedData).unwrap();
            cms.set_content_type(1, ContentType::Data).unwrap();
            cms.add_digest_algo(OID_SHA1).unwrap();
            cms.add_signer(cert);
            let sink = hashed.clone();
            cms.set_hash_function(move |data| sink.borrow_mut().extend_from_slice(data));

            assert_eq!(cms.build().unwrap(), StopReason::GotContent);
            assert_eq!(cms.build().unwrap(), StopReason::BeginData);
            cms.write_data(payload).unwrap();
            cms.set_message_digest(0, &digest).unwrap();
            assert_eq!(cms.build().unwrap(), StopReason::NeedSig);
            cms.hash_signed_attrs(0).unwrap();
            cms.set_sig_val(0, OID_RSA, signature).unwrap();
            assert_eq!(cms.build().unwrap(), StopReason::Ready);

            // Post-build accessors answer from the emitted SignerInfos.
            assert_eq!(cms.get_message_digest(0).unwrap().unwrap(), digest);
        }

        let hashed = hashed.borrow().clone();
        (output, digest, hashed)
    }

    #[test]
    fn attached_round_trip() {
        let signature = vec![0x5a; 32];
        let (output, digest, built_attr_hash) = build_attached(b"Hello", &signature);

        let content = Rc::new(RefCell::new(Vec::new()));
        let mut slice: &[u8] = &output;
        let reader: &mut dyn Read = &mut slice;

        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        let sink = content.clone();
        cms.set_hash_function(move |data| sink.borrow_mut().extend_from_slice(data));

        assert_eq!(cms.parse().unwrap(), StopReason::GotContent);
        assert_eq!(cms.parse().unwrap(), StopReason::BeginData);
        assert_eq!(cms.parse().unwrap(), StopReason::EndData);
        assert_eq!(cms.parse().unwrap(), StopReason::Ready);

        // The callback observed exactly the payload.
        assert_eq!(content.borrow().as_slice(), b"Hello");

        assert_eq!(cms.get_content_type(0), Some(ContentType::SignedData));
        assert_eq!(cms.get_content_type(1), Some(ContentType::Data));
        assert_eq!(cms.get_content_oid(0), Some("1.2.840.113549.1.7.2"));
        assert_eq!(cms.get_content_oid(1), Some("1.2.840.113549.1.7.1"));
        assert_eq!(cms.get_digest_algo_list(0), Some(OID_SHA1));

        assert_eq!(cms.get_message_digest(0).unwrap().unwrap(), digest);
        assert_eq!(cms.get_digest_algo(0).unwrap(), OID_SHA1);
        // Memoised result stays stable across calls.
        assert_eq!(cms.get_digest_algo(0).unwrap(), OID_SHA1);

        let sig_val = cms.get_sig_val(0).unwrap();
        assert!(sig_val.starts_with(b"(7:sig-val(3:rsa(1:s32:"));
        assert!(sig_val.ends_with(b")))"));

        // Hashing the recovered signed attributes must reproduce, byte
        // for byte, what the build-side caller hashed before signing.
        cms.hash_signed_attrs(0).unwrap();
        let collected = content.borrow();
        assert_eq!(collected[5], 0x31);
        assert_eq!(&collected[5..], built_attr_hash.as_slice());
    }

    #[test]
    fn parse_while_running_is_an_invalid_state() {
        let (output, _, _) = build_attached(b"Hello", &[0x5a; 32]);

        let mut slice: &[u8] = &output;
        let reader: &mut dyn Read = &mut slice;
        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();

        assert_eq!(cms.parse().unwrap(), StopReason::GotContent);
        assert_eq!(cms.parse().unwrap(), StopReason::BeginData);
        // No hash function registered: the step refuses and stays running.
        assert!(matches!(cms.parse(), Err(CmsError::MissingAction)));
        assert!(matches!(cms.parse(), Err(CmsError::InvalidState)));
    }

    #[test]
    fn issuer_serial_from_parsed_container() {
        let (output, _, _) = build_attached(b"Hello", &[0x5a; 32]);
        let cert = testutil::test_cert();

        let mut slice: &[u8] = &output;
        let reader: &mut dyn Read = &mut slice;
        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        cms.set_hash_function(|_| {});
        while cms.parse().unwrap() != StopReason::Ready {}

        let (issuer, serial) = cms.get_issuer_serial(0).unwrap();
        assert_eq!(issuer, "CN=Unit Tester,OU=unit,O=testing,ST=California,C=US");

        let (_, content) = crate::ber::split_tlv(cert.serial_data()).unwrap();
        assert_eq!(&serial[..4], &(content.len() as u32).to_be_bytes()[..]);
        assert_eq!(&serial[4..], content);
    }

    #[test]
    fn hashed_attributes_are_the_embedded_region_retagged() {
        let cert = testutil::test_cert();
        let digest = sha1(b"payload");
        let hashed = Rc::new(RefCell::new(Vec::new()));

        let mut output = Vec::new();
        let mut cms = Cms::new();
        cms.set_reader_writer(None, Some(&mut output)).unwrap();
        cms.set_content_type(0, ContentType::SignedData).unwrap();
        cms.set_content_type(1, ContentType::Data).unwrap();
        cms.add_digest_algo(OID_SHA1).unwrap();
        cms.add_signer(cert);
        let sink = hashed.clone();
        cms.set_hash_function(move |data| sink.borrow_mut().extend_from_slice(data));

        cms.build().unwrap();
        cms.build().unwrap();
        cms.write_data(b"payload").unwrap();
        cms.set_message_digest(0, &digest).unwrap();
        cms.build().unwrap();
        cms.hash_signed_attrs(0).unwrap();

        let image = cms.cert_list[0].attr.as_ref().unwrap().image.clone();
        let hashed = hashed.borrow();
        assert_eq!(hashed[0], 0x31);
        assert_eq!(hashed.len(), image.len());
        assert_eq!(&hashed[1..], &image[1..]);
        // The embedded region carries the implicit [0] tag instead.
        assert_eq!(image[0], 0xa0);
    }

    #[test]
    fn detached_build_and_parse() {
        let cert = testutil::test_cert();
        let digest = sha1(b"external payload");

        let mut output = Vec::new();
        {
            let mut cms = Cms::new();
            cms.set_reader_writer(None, Some(&mut output)).unwrap();
            cms.set_content_type(0, ContentType::SignedData).unwrap();
            cms.set_content_type(1, ContentType::Data).unwrap();
            cms.add_digest_algo(OID_SHA1).unwrap();
            cms.add_signer(cert);
            // A digest present before the build starts makes the
            // signature detached.
            cms.set_message_digest(0, &digest).unwrap();
            cms.set_hash_function(|_| {});

            assert_eq!(cms.build().unwrap(), StopReason::GotContent);
            assert_eq!(cms.build().unwrap(), StopReason::EndData);
            assert_eq!(cms.build().unwrap(), StopReason::NeedSig);
            cms.hash_signed_attrs(0).unwrap();
            cms.set_sig_val(0, OID_RSA, &[0x11; 16]).unwrap();
            assert_eq!(cms.build().unwrap(), StopReason::Ready);
        }

        let mut slice: &[u8] = &output;
        let reader: &mut dyn Read = &mut slice;
        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();

        assert_eq!(cms.parse().unwrap(), StopReason::GotContent);
        assert_eq!(cms.parse().unwrap(), StopReason::NeedHash);
        assert_eq!(cms.parse().unwrap(), StopReason::Ready);

        assert_eq!(cms.get_message_digest(0).unwrap().unwrap(), digest);
    }

    #[test]
    fn zero_signers_is_a_missing_value() {
        let mut output = Vec::new();
        let mut cms = Cms::new();
        cms.set_reader_writer(None, Some(&mut output)).unwrap();
        cms.set_content_type(0, ContentType::SignedData).unwrap();
        cms.set_content_type(1, ContentType::Data).unwrap();
        cms.add_digest_algo(OID_SHA1).unwrap();

        assert_eq!(cms.build().unwrap(), StopReason::GotContent);
        assert_eq!(cms.build().unwrap(), StopReason::BeginData);
        assert!(matches!(cms.build(), Err(CmsError::MissingValue)));

        // The failed step left the engine running; it cannot be resumed.
        assert!(matches!(cms.build(), Err(CmsError::InvalidState)));
    }

    #[test]
    fn zero_digest_algos_is_a_missing_value() {
        let mut output = Vec::new();
        let mut cms = Cms::new();
        cms.set_reader_writer(None, Some(&mut output)).unwrap();
        cms.set_content_type(0, ContentType::SignedData).unwrap();
        cms.set_content_type(1, ContentType::Data).unwrap();
        cms.add_signer(testutil::test_cert());

        cms.build().unwrap();
        cms.build().unwrap();
        assert!(matches!(cms.build(), Err(CmsError::MissingValue)));
    }

    #[test]
    fn build_prerequisites_are_checked_up_front() {
        let mut cms = Cms::new();
        assert!(matches!(cms.build(), Err(CmsError::MissingAction)));

        let mut output = Vec::new();
        let mut cms = Cms::new();
        cms.set_reader_writer(None, Some(&mut output)).unwrap();
        assert!(matches!(cms.build(), Err(CmsError::MissingAction)));

        cms.set_content_type(0, ContentType::SignedData).unwrap();
        // Still no inner content type.
        assert!(matches!(cms.build(), Err(CmsError::MissingAction)));
    }

    #[test]
    fn missing_signature_is_a_missing_value() {
        let cert = testutil::test_cert();
        let mut output = Vec::new();
        let mut cms = Cms::new();
        cms.set_reader_writer(None, Some(&mut output)).unwrap();
        cms.set_content_type(0, ContentType::SignedData).unwrap();
        cms.set_content_type(1, ContentType::Data).unwrap();
        cms.add_digest_algo(OID_SHA1).unwrap();
        cms.add_signer(cert);

        cms.build().unwrap();
        cms.build().unwrap();
        cms.write_data(b"x").unwrap();
        cms.set_message_digest(0, &sha1(b"x")).unwrap();
        assert_eq!(cms.build().unwrap(), StopReason::NeedSig);
        assert!(matches!(cms.build(), Err(CmsError::MissingValue)));
    }
}
