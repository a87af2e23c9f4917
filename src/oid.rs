// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Conversion between dotted-decimal OID strings and DER content octets.

The public API talks dotted strings ("1.2.840.113549.1.7.2") while the
wire and `bcder` talk content octets. Both directions validate their
input; the first two arcs share an octet per X.690 8.19.
*/

use crate::CmsError;

/// Encode a dotted-decimal OID string into DER content octets.
pub(crate) fn from_dotted(s: &str) -> Result<Vec<u8>, CmsError> {
    let mut arcs = s.split('.').map(|part| {
        if part.is_empty() || (part.len() > 1 && part.starts_with('0')) {
            return Err(CmsError::MalformedOid);
        }
        part.parse::<u64>().map_err(|_| CmsError::MalformedOid)
    });

    let first = arcs.next().ok_or(CmsError::MalformedOid)??;
    let second = arcs.next().ok_or(CmsError::MalformedOid)??;

    if first > 2 || (first < 2 && second >= 40) {
        return Err(CmsError::MalformedOid);
    }

    let mut out = Vec::with_capacity(s.len() / 2);
    push_base128(&mut out, first * 40 + second);
    for arc in arcs {
        push_base128(&mut out, arc?);
    }

    Ok(out)
}

/// Decode DER content octets into a dotted-decimal OID string.
pub(crate) fn to_dotted(der: &[u8]) -> Result<String, CmsError> {
    if der.is_empty() || der[der.len() - 1] & 0x80 != 0 {
        return Err(CmsError::MalformedOid);
    }

    let mut out = String::new();
    let mut value: u64 = 0;
    let mut first = true;

    for &octet in der {
        value = value
            .checked_mul(128)
            .and_then(|v| v.checked_add(u64::from(octet & 0x7f)))
            .ok_or(CmsError::MalformedOid)?;

        if octet & 0x80 == 0 {
            if first {
                let (a, b) = if value < 40 {
                    (0, value)
                } else if value < 80 {
                    (1, value - 40)
                } else {
                    (2, value - 80)
                };
                out.push_str(&format!("{}.{}", a, b));
                first = false;
            } else {
                out.push_str(&format!(".{}", value));
            }
            value = 0;
        }
    }

    Ok(out)
}

fn push_base128(out: &mut Vec<u8>, mut value: u64) {
    let mut stack = [0u8; 10];
    let mut n = 0;

    stack[n] = (value & 0x7f) as u8;
    n += 1;
    value >>= 7;
    while value != 0 {
        stack[n] = (value & 0x7f) as u8 | 0x80;
        n += 1;
        value >>= 7;
    }

    while n > 0 {
        n -= 1;
        out.push(stack[n]);
    }
}
