// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Distinguished name to RFC 2253 string conversion.

`get_issuer_serial` reports the signer's issuer as a string so callers
can look the certificate up in their own stores. RFC 2253 output starts
with the most specific RDN, so the sequence is walked in reverse.
*/

use {
    crate::{
        asn1::rfc3280::{AttributeTypeAndValue, Name},
        oid, CmsError,
    },
    bcder::{
        decode::{Constructed, Unimplemented},
        string::{Ia5String, PrintableString, Utf8String},
        Captured, Mode, Tag,
    },
    std::fmt::Write,
};

/// Attribute types with a short name registered in RFC 2253 / RFC 4519.
/// Everything else is written as a dotted OID with a hex-encoded value.
static ATTRIBUTE_NAMES: &[(&[u8], &str)] = &[
    (&[85, 4, 3], "CN"),
    (&[85, 4, 6], "C"),
    (&[85, 4, 7], "L"),
    (&[85, 4, 8], "ST"),
    (&[85, 4, 9], "STREET"),
    (&[85, 4, 10], "O"),
    (&[85, 4, 11], "OU"),
    (&[9, 146, 38, 137, 147, 242, 44, 100, 1, 1], "UID"),
    (&[9, 146, 38, 137, 147, 242, 44, 100, 1, 25], "DC"),
];

/// Render a parsed name in RFC 2253 form.
pub(crate) fn to_rfc2253(name: &Name) -> Result<String, CmsError> {
    let Name::RdnSequence(sequence) = name;

    let mut out = String::new();
    for (i, rdn) in sequence.iter().rev().enumerate() {
        if i > 0 {
            out.push(',');
        }
        for (j, ava) in rdn.iter().enumerate() {
            if j > 0 {
                out.push('+');
            }
            write_attribute(&mut out, ava)?;
        }
    }

    Ok(out)
}

fn write_attribute(out: &mut String, ava: &AttributeTypeAndValue) -> Result<(), CmsError> {
    let type_der: &[u8] = ava.typ.0.as_ref();
    let known = ATTRIBUTE_NAMES
        .iter()
        .find(|(der, _)| *der == type_der)
        .map(|(_, label)| *label);

    match known {
        Some(label) => out.push_str(label),
        None => out.push_str(&oid::to_dotted(type_der)?),
    }
    out.push('=');

    match decode_string(&ava.value) {
        Some(text) if known.is_some() => push_escaped(out, &text),
        // RFC 2253 section 2.4: values of unknown types, or values that
        // do not decode as a string, are written as #hex of the DER.
        _ => {
            let _ = write!(out, "#{}", hex::encode(ava.value.as_slice()));
        }
    }

    Ok(())
}

fn decode_string(value: &Captured) -> Option<String> {
    Constructed::decode(value.as_slice(), Mode::Ber, |cons| {
        cons.take_value(|tag, content| {
            if tag == Tag::PRINTABLE_STRING {
                Ok(PrintableString::from_content(content)?.to_string())
            } else if tag == Tag::UTF8_STRING {
                Ok(Utf8String::from_content(content)?.to_string())
            } else if tag == Tag::IA5_STRING {
                Ok(Ia5String::from_content(content)?.to_string())
            } else {
                Err(Unimplemented.into())
            }
        })
    })
    .ok()
}

fn push_escaped(out: &mut String, value: &str) {
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let escape = match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => true,
            '#' | ' ' if i == 0 => true,
            ' ' if i == last => true,
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::asn1::rfc3280::Name,
        bcder::{decode::Constructed, Mode},
    };

    // issuer of the suite's test certificate:
    //   C=US, ST=California, O=testing, OU=unit, CN=Unit Tester
    const ISSUER_DER: &[u8] = &[
        0x30, 0x59, 0x31, 0x0b, 0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x06, 0x13, 0x02, 0x55, 0x53,
        0x31, 0x13, 0x30, 0x11, 0x06, 0x03, 0x55, 0x04, 0x08, 0x0c, 0x0a, 0x43, 0x61, 0x6c, 0x69,
        0x66, 0x6f, 0x72, 0x6e, 0x69, 0x61, 0x31, 0x10, 0x30, 0x0e, 0x06, 0x03, 0x55, 0x04, 0x0a,
        0x0c, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67, 0x31, 0x0d, 0x30, 0x0b, 0x06, 0x03,
        0x55, 0x04, 0x0b, 0x0c, 0x04, 0x75, 0x6e, 0x69, 0x74, 0x31, 0x14, 0x30, 0x12, 0x06, 0x03,
        0x55, 0x04, 0x03, 0x0c, 0x0b, 0x55, 0x6e, 0x69, 0x74, 0x20, 0x54, 0x65, 0x73, 0x74, 0x65,
        0x72,
    ];

    #[test]
    fn formats_reversed_with_short_names() {
        let name =
            Constructed::decode(ISSUER_DER, Mode::Der, |cons| Name::take_from(cons)).unwrap();
        assert_eq!(
            to_rfc2253(&name).unwrap(),
            "CN=Unit Tester,OU=unit,O=testing,ST=California,C=US"
        );
    }

    #[test]
    fn escapes_specials() {
        let mut out = String::new();
        push_escaped(&mut out, "Acme, Inc. + Co;");
        assert_eq!(out, "Acme\\, Inc. \\+ Co\\;");

        let mut out = String::new();
        push_escaped(&mut out, " leading and trailing ");
        assert_eq!(out, "\\ leading and trailing\\ ");

        let mut out = String::new();
        push_escaped(&mut out, "#hash");
        assert_eq!(out, "\\#hash");
    }
}
