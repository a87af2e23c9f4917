// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The signed-data parse state machine.

Parsing runs in caller-pumped steps over a monotonically consumed
reader:

* the initial step identifies the outer content type,
* START reads the signed-data prefix up to the encapsulated content and
  decides attached versus detached,
* IN_DATA streams the encapsulated octets through the hash callback,
* GOT_HASH reads certificates and the `SignerInfos` block.

Between steps the open nesting levels are remembered as frames: a
definite-length region is delimited by its absolute end offset, an
indefinite one by its end-of-contents octets.
*/

use {
    crate::{
        asn1::rfc5652::{CertificateChoices, CertificateSet, DigestAlgorithmIdentifiers},
        ber::{self, BerReader, Header},
        certificate::Certificate,
        cms::{Cms, SignerInfoSet, SignerRecord},
        content::{self, StopReason},
        oid, CmsError,
    },
    bcder::{decode::Constructed, Mode, Tag},
};

/// One open nesting level of the container being read.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    /// Absolute end offset for a definite region, `None` for indefinite.
    end: Option<u64>,
}

impl Frame {
    fn open(hdr: &Header, pos: u64) -> Self {
        Self {
            end: hdr.length.map(|len| pos + len as u64),
        }
    }
}

/// Structural bookkeeping carried across parse steps.
pub(crate) struct SignedDataState {
    content_info: Frame,
    explicit_content: Frame,
    signed_data: Option<Frame>,
    /// Open until the encapsulated content (or its absence) has been
    /// consumed.
    encap: Option<Frame>,
    /// The `[0]` wrapper around the embedded payload; `None` for a
    /// detached signature.
    inner_content: Option<Frame>,
}

/// Initial engine step: read the outer ContentInfo header and install
/// the handler for its content type.
pub(crate) fn content_info(cms: &mut Cms) -> Result<(), CmsError> {
    let rdr = cms.reader.as_mut().ok_or(CmsError::MissingAction)?;

    let hdr = rdr.read_header()?;
    if !hdr.is(ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE) {
        return Err(CmsError::InvalidCmsObject("ContentInfo must be a SEQUENCE"));
    }
    let content_info = Frame::open(&hdr, rdr.pos());

    let oid_hdr = rdr.read_header()?;
    if !oid_hdr.is(ber::CLASS_UNIVERSAL, false, ber::TAG_OID) {
        return Err(CmsError::InvalidCmsObject(
            "contentType must be an OBJECT IDENTIFIER",
        ));
    }
    let oid_content = rdr.read_content(definite(&oid_hdr)?)?;

    let handler = content::by_oid_der(&oid_content).ok_or_else(|| {
        CmsError::UnknownCmsObject(
            oid::to_dotted(&oid_content).unwrap_or_else(|_| hex::encode(&oid_content)),
        )
    })?;
    if handler.parse.is_none() {
        return Err(CmsError::UnsupportedCmsObject(handler.oid.to_string()));
    }

    let wrapper = rdr.read_header()?;
    if !wrapper.is(ber::CLASS_CONTEXT, true, 0) {
        return Err(CmsError::InvalidCmsObject("content must sit under a [0] tag"));
    }
    let explicit_content = Frame::open(&wrapper, rdr.pos());

    cms.content = Some(handler);
    cms.parse_state = Some(SignedDataState {
        content_info,
        explicit_content,
        signed_data: None,
        encap: None,
        inner_content: None,
    });
    Ok(())
}

/// The signed-data parse handler. Derives its internal state from the
/// reason the engine last stopped, performs one step, and stores the
/// next stop reason.
pub(crate) fn signed_data(cms: &mut Cms) -> Result<(), CmsError> {
    enum State {
        Start,
        GotHash,
        InData,
    }

    let stop_reason = cms.stop_reason;
    cms.stop_reason = StopReason::Running;

    let state = match stop_reason {
        StopReason::GotContent => State::Start,
        StopReason::NeedHash => State::GotHash,
        StopReason::BeginData => {
            if cms.hash_fnc.is_none() {
                return Err(CmsError::MissingAction);
            }
            State::InData
        }
        StopReason::EndData => State::GotHash,
        StopReason::Running => return Err(CmsError::InvalidState),
        _ => return Err(CmsError::Bug("impossible stop reason in signed-data parser")),
    };

    match state {
        State::Start => part_1(cms)?,
        State::InData => hash_content(cms)?,
        State::GotHash => part_2(cms)?,
    }

    cms.stop_reason = match state {
        State::Start => {
            if cms.detached_signature && cms.data_digest.is_none() {
                // Tell the caller the signature is detached. The data can
                // be hashed now or later.
                StopReason::NeedHash
            } else {
                StopReason::BeginData
            }
        }
        State::InData => StopReason::EndData,
        State::GotHash => StopReason::Ready,
    };
    Ok(())
}

/// START: version, digest algorithms and the encapContentInfo header,
/// deciding attached versus detached on the way.
fn part_1(cms: &mut Cms) -> Result<(), CmsError> {
    let state = cms
        .parse_state
        .as_mut()
        .ok_or(CmsError::Bug("parse state missing"))?;
    let rdr = cms.reader.as_mut().ok_or(CmsError::MissingAction)?;

    let hdr = rdr.read_header()?;
    if !hdr.is(ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE) {
        return Err(CmsError::InvalidCmsObject("signed-data must be a SEQUENCE"));
    }
    let signed_data = Frame::open(&hdr, rdr.pos());

    let version_hdr = rdr.read_header()?;
    if !version_hdr.is(ber::CLASS_UNIVERSAL, false, ber::TAG_INTEGER) {
        return Err(CmsError::InvalidCmsObject("version must be an INTEGER"));
    }
    let version_len = definite(&version_hdr)?;
    if version_len == 0 || version_len > 4 {
        return Err(CmsError::InvalidCmsObject("unreasonable version length"));
    }
    rdr.read_content(version_len)?;

    let set_hdr = rdr.read_header()?;
    if !set_hdr.is(ber::CLASS_UNIVERSAL, true, ber::TAG_SET) {
        return Err(CmsError::InvalidCmsObject("expected digestAlgorithms SET"));
    }
    let mut image = Vec::new();
    rdr.capture(&set_hdr, &mut image)?;
    let algos = Constructed::decode(image.as_slice(), Mode::Ber, |cons| {
        DigestAlgorithmIdentifiers::take_from(cons)
    })?;
    for identifier in algos.iter() {
        cms.digest_algos
            .push(oid::to_dotted(identifier.algorithm.0.as_ref())?);
    }

    let encap_hdr = rdr.read_header()?;
    if !encap_hdr.is(ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE) {
        return Err(CmsError::InvalidCmsObject(
            "encapContentInfo must be a SEQUENCE",
        ));
    }
    let encap = Frame::open(&encap_hdr, rdr.pos());

    let oid_hdr = rdr.read_header()?;
    if !oid_hdr.is(ber::CLASS_UNIVERSAL, false, ber::TAG_OID) {
        return Err(CmsError::InvalidCmsObject(
            "eContentType must be an OBJECT IDENTIFIER",
        ));
    }
    let oid_content = rdr.read_content(definite(&oid_hdr)?)?;
    cms.encap_cont_type = Some(oid::to_dotted(&oid_content)?);

    // An embedded payload shows up as a [0] wrapper here; its absence
    // makes this a detached signature.
    let mut encap_open = Some(encap);
    let mut inner_content = None;
    if at_definite_end(rdr, encap) {
        encap_open = None;
    } else {
        let next = rdr.read_header()?;
        if next.is_end_of_contents() {
            if encap.end.is_some() {
                return Err(CmsError::InvalidCmsObject("stray end-of-contents octets"));
            }
            encap_open = None;
        } else if next.is(ber::CLASS_CONTEXT, true, 0) {
            inner_content = Some(Frame::open(&next, rdr.pos()));
        } else {
            return Err(CmsError::InvalidCmsObject(
                "unexpected element in encapContentInfo",
            ));
        }
    }

    cms.detached_signature = inner_content.is_none();
    state.signed_data = Some(signed_data);
    state.encap = encap_open;
    state.inner_content = inner_content;
    Ok(())
}

/// IN_DATA: stream the encapsulated OCTET STRING content through the
/// hash callback and consume the wrappers around it.
fn hash_content(cms: &mut Cms) -> Result<(), CmsError> {
    let state = cms
        .parse_state
        .as_mut()
        .ok_or(CmsError::Bug("parse state missing"))?;

    let inner = match state.inner_content.take() {
        Some(frame) => frame,
        // Detached with a preset digest: nothing embedded to read.
        None => return Ok(()),
    };

    let rdr = cms.reader.as_mut().ok_or(CmsError::MissingAction)?;
    let hash_fnc = cms.hash_fnc.as_mut().ok_or(CmsError::MissingAction)?;

    walk_octet_strings(rdr, inner, hash_fnc)?;

    if let Some(encap) = state.encap.take() {
        close_frame(rdr, encap)?;
    }
    Ok(())
}

/// GOT_HASH: optional certificates, optional CRLs, then the
/// `SignerInfos` block, and the closing of every outer wrapper.
fn part_2(cms: &mut Cms) -> Result<(), CmsError> {
    let state = cms
        .parse_state
        .as_mut()
        .ok_or(CmsError::Bug("parse state missing"))?;
    let signed_data = state
        .signed_data
        .ok_or(CmsError::Bug("signed-data frame missing"))?;
    let rdr = cms.reader.as_mut().ok_or(CmsError::MissingAction)?;

    let mut signer_image = None;
    loop {
        if at_definite_end(rdr, signed_data) {
            break;
        }
        let hdr = rdr.read_header()?;
        if hdr.is_end_of_contents() {
            if signed_data.end.is_some() {
                return Err(CmsError::InvalidCmsObject("stray end-of-contents octets"));
            }
            break;
        }

        if hdr.is(ber::CLASS_CONTEXT, true, 0) {
            let mut image = Vec::new();
            rdr.capture(&hdr, &mut image)?;
            let certs = Constructed::decode(image.as_slice(), Mode::Ber, |cons| {
                cons.take_constructed_if(Tag::CTX_0, |cons| CertificateSet::take_from(cons))
            })?;
            for choice in certs.iter() {
                let CertificateChoices::Certificate(cert) = choice;
                cms.cert_list.push(SignerRecord {
                    cert: Some(Certificate::try_from(cert.as_ref())?),
                    msg_digest: None,
                    attr: None,
                    sig_val: None,
                });
            }
        } else if hdr.class == ber::CLASS_CONTEXT && hdr.tag == 1 {
            // CRLs have no consumer in this engine.
            rdr.skip(&hdr)?;
        } else if hdr.is(ber::CLASS_UNIVERSAL, true, ber::TAG_SET) {
            let mut image = Vec::new();
            rdr.capture(&hdr, &mut image)?;
            signer_image = Some(image);
        } else {
            return Err(CmsError::InvalidCmsObject(
                "unexpected element in signed-data",
            ));
        }
    }

    close_frame(rdr, state.explicit_content)?;
    close_frame(rdr, state.content_info)?;

    let image = signer_image.ok_or(CmsError::InvalidCmsObject("missing SignerInfos"))?;
    cms.signer_info = Some(SignerInfoSet::from_image(image)?);
    Ok(())
}

/// Feed every OCTET STRING inside `frame` to `sink`, recursing through
/// BER constructed-string chunking.
fn walk_octet_strings(
    rdr: &mut BerReader,
    frame: Frame,
    sink: &mut dyn FnMut(&[u8]),
) -> Result<(), CmsError> {
    loop {
        if at_definite_end(rdr, frame) {
            return Ok(());
        }
        let hdr = rdr.read_header()?;
        if hdr.is_end_of_contents() {
            if frame.end.is_some() {
                return Err(CmsError::InvalidCmsObject("stray end-of-contents octets"));
            }
            return Ok(());
        }
        if hdr.class != ber::CLASS_UNIVERSAL || hdr.tag != ber::TAG_OCTET_STRING {
            return Err(CmsError::InvalidCmsObject(
                "encapsulated content must be OCTET STRING",
            ));
        }
        if hdr.constructed {
            let child = Frame::open(&hdr, rdr.pos());
            walk_octet_strings(rdr, child, sink)?;
        } else {
            rdr.copy_content(definite(&hdr)?, sink)?;
        }
    }
}

fn definite(hdr: &Header) -> Result<usize, CmsError> {
    hdr.length
        .ok_or(CmsError::InvalidCmsObject("unexpected indefinite length"))
}

fn at_definite_end(rdr: &BerReader, frame: Frame) -> bool {
    matches!(frame.end, Some(end) if rdr.pos() >= end)
}

/// Consume whatever ends `frame`: nothing for an exhausted definite
/// region, the end-of-contents octets for an indefinite one.
fn close_frame(rdr: &mut BerReader, frame: Frame) -> Result<(), CmsError> {
    match frame.end {
        Some(end) => {
            if rdr.pos() == end {
                Ok(())
            } else {
                Err(CmsError::InvalidCmsObject(
                    "definite-length region size mismatch",
                ))
            }
        }
        None => {
            let hdr = rdr.read_header()?;
            if hdr.is_end_of_contents() {
                Ok(())
            } else {
                Err(CmsError::InvalidCmsObject("missing end-of-contents octets"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{ber, oid},
        std::io::Read,
    };

    fn content_info_prefix(oid_str: &str) -> Vec<u8> {
        let mut out = Vec::new();
        ber::write_header(&mut out, ber::CLASS_UNIVERSAL, true, ber::TAG_SEQUENCE, None).unwrap();
        ber::write_oid(&mut out, &oid::from_dotted(oid_str).unwrap()).unwrap();
        ber::write_header(&mut out, ber::CLASS_CONTEXT, true, 0, None).unwrap();
        out
    }

    #[test]
    fn unknown_content_oid() {
        let data = content_info_prefix("1.2.3.4");
        let mut slice: &[u8] = &data;
        let reader: &mut dyn Read = &mut slice;

        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        match cms.parse() {
            Err(CmsError::UnknownCmsObject(oid)) => assert_eq!(oid, "1.2.3.4"),
            other => panic!("expected UnknownCmsObject, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn known_but_unsupported_content_oid() {
        let data = content_info_prefix("1.2.840.113549.1.9.16.1.2");
        let mut slice: &[u8] = &data;
        let reader: &mut dyn Read = &mut slice;

        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        match cms.parse() {
            Err(CmsError::UnsupportedCmsObject(oid)) => {
                assert_eq!(oid, "1.2.840.113549.1.9.16.1.2")
            }
            other => panic!("expected UnsupportedCmsObject, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn data_content_parse_is_a_stub() {
        let data = content_info_prefix("1.2.840.113549.1.7.1");
        let mut slice: &[u8] = &data;
        let reader: &mut dyn Read = &mut slice;

        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        assert_eq!(cms.parse().unwrap(), StopReason::GotContent);
        assert!(matches!(cms.parse(), Err(CmsError::NotImplemented)));
    }

    #[test]
    fn parse_without_reader() {
        let mut cms = Cms::new();
        assert!(matches!(cms.parse(), Err(CmsError::MissingAction)));
    }

    #[test]
    fn garbage_input() {
        let mut slice: &[u8] = &[0x02, 0x01, 0x2a];
        let reader: &mut dyn Read = &mut slice;

        let mut cms = Cms::new();
        cms.set_reader_writer(Some(reader), None).unwrap();
        assert!(matches!(
            cms.parse(),
            Err(CmsError::InvalidCmsObject("ContentInfo must be a SEQUENCE"))
        ));
    }
}
