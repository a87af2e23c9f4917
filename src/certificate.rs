// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! High-level X.509 certificate interface.

A certificate only participates in this crate as a signer description:
the builder copies its issuer and serial number into `SignerInfo`
bit-exact, and `get_cert` hands parsed certificates back to the caller.
Key material and signature checking stay with the caller's crypto
library.
*/

use {
    crate::{
        asn1::{rfc3280::Name, rfc5280},
        CmsError,
    },
    bcder::{decode::Constructed, encode::PrimitiveContent, encode::Values, Integer, Mode},
};

/// An X.509 certificate describing a signer.
#[derive(Clone, Debug)]
pub struct Certificate {
    /// Raw DER of `tbsCertificate.issuer`, header octets included.
    issuer_data: Vec<u8>,

    /// Raw DER of `tbsCertificate.serialNumber`, header octets included.
    serial_data: Vec<u8>,

    /// The parsed ASN.1 certificate backing this instance.
    raw_cert: rfc5280::Certificate,
}

impl Certificate {
    /// Obtain an instance from an already parsed ASN.1 structure.
    ///
    /// When the structure does not carry raw field images (it was built
    /// in memory rather than parsed), the issuer and serial images are
    /// produced by DER-encoding the parsed values.
    pub fn from_parsed_asn1(cert: rfc5280::Certificate) -> Result<Self, CmsError> {
        let issuer_data = match &cert.tbs_certificate.issuer_data {
            Some(data) => data.clone(),
            None => encode_to_der(cert.tbs_certificate.issuer.encode_ref())?,
        };
        let serial_data = match &cert.tbs_certificate.serial_data {
            Some(data) => data.clone(),
            None => encode_to_der((&cert.tbs_certificate.serial_number).encode())?,
        };

        Ok(Self {
            issuer_data,
            serial_data,
            raw_cert: cert,
        })
    }

    pub fn from_der(data: &[u8]) -> Result<Self, CmsError> {
        let cert = Constructed::decode(data, Mode::Der, |cons| {
            rfc5280::Certificate::take_from(cons)
        })?;

        Self::from_parsed_asn1(cert)
    }

    pub fn from_pem(data: &[u8]) -> Result<Self, CmsError> {
        let pem = pem::parse(data)?;

        Self::from_der(&pem.contents)
    }

    /// Parse PEM data potentially containing multiple certificate records.
    pub fn from_pem_multiple(data: impl AsRef<[u8]>) -> Result<Vec<Self>, CmsError> {
        pem::parse_many(data)?
            .into_iter()
            .map(|pem| Self::from_der(&pem.contents))
            .collect()
    }

    /// The serial number of this certificate.
    pub fn serial_number(&self) -> &Integer {
        &self.raw_cert.tbs_certificate.serial_number
    }

    /// The subject of this certificate.
    pub fn subject(&self) -> &Name {
        &self.raw_cert.tbs_certificate.subject
    }

    /// The issuer of this certificate.
    pub fn issuer(&self) -> &Name {
        &self.raw_cert.tbs_certificate.issuer
    }

    /// Raw DER of the issuer field, exactly as it appeared in the
    /// certificate image.
    pub fn issuer_data(&self) -> &[u8] {
        &self.issuer_data
    }

    /// Raw DER of the serialNumber field, exactly as it appeared in the
    /// certificate image.
    pub fn serial_data(&self) -> &[u8] {
        &self.serial_data
    }

    /// Obtain the parsed certificate structure backing this instance.
    pub fn raw_certificate(&self) -> &rfc5280::Certificate {
        &self.raw_cert
    }

    /// Serialize this certificate to DER.
    pub fn as_der(&self) -> Result<Vec<u8>, CmsError> {
        encode_to_der(self.raw_cert.encode_ref())
    }
}

impl TryFrom<&rfc5280::Certificate> for Certificate {
    type Error = CmsError;

    fn try_from(cert: &rfc5280::Certificate) -> Result<Self, Self::Error> {
        Self::from_parsed_asn1(cert.clone())
    }
}

fn encode_to_der(values: impl Values) -> Result<Vec<u8>, CmsError> {
    let mut data = Vec::new();
    values.write_encoded(Mode::Der, &mut data)?;
    Ok(data)
}
