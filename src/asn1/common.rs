// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Time types shared by the certificate structures.

Only the `YYMMDDHHMMSSZ` / `YYYYMMDDHHMMSSZ` forms are accepted; CMS
certificates in the wild use nothing else.
*/

use {
    bcder::{
        decode::{Constructed, Malformed, Primitive, Source},
        encode::{PrimitiveContent, Values},
        Mode, Tag,
    },
    chrono::{Datelike, TimeZone, Timelike},
    std::{fmt, io::Write},
};

/// ```ASN.1
/// Time ::= CHOICE {
///   utcTime UTCTime,
///   generalTime GeneralizedTime }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Time {
    UtcTime(UtcTime),
    GeneralTime(GeneralizedTime),
}

impl Time {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, S::Err> {
        cons.take_primitive(|tag, prim| match tag {
            Tag::UTC_TIME => Ok(Self::UtcTime(UtcTime::from_primitive(prim)?)),
            Tag::GENERALIZED_TIME => Ok(Self::GeneralTime(GeneralizedTime::from_primitive(prim)?)),
            _ => Err(Malformed.into()),
        })
    }

    pub fn encode_ref(&self) -> impl Values + '_ {
        match self {
            Self::UtcTime(utc) => (Some(utc.encode_ref()), None),
            Self::GeneralTime(gt) => (None, Some(gt.encode_ref())),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtcTime(chrono::DateTime<chrono::Utc>);

impl UtcTime {
    pub fn from_primitive<S: Source>(prim: &mut Primitive<S>) -> Result<Self, S::Err> {
        let data = prim.take_all()?;

        if data.len() != "YYMMDDHHMMSSZ".len() || data[12] != b'Z' {
            return Err(Malformed.into());
        }

        let year = u32::from(digits(&data, 0)?);
        let year = if year >= 50 { year + 1900 } else { year + 2000 };

        build_datetime(
            year as i32,
            digits(&data, 2)?,
            digits(&data, 4)?,
            digits(&data, 6)?,
            digits(&data, 8)?,
            digits(&data, 10)?,
        )
        .map(Self)
        .ok_or_else(|| Malformed.into())
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year() % 100,
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl PrimitiveContent for UtcTime {
    const TAG: Tag = Tag::UTC_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        "YYMMDDHHMMSSZ".len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralizedTime(chrono::DateTime<chrono::Utc>);

impl GeneralizedTime {
    pub fn from_primitive<S: Source>(prim: &mut Primitive<S>) -> Result<Self, S::Err> {
        let data = prim.take_all()?;

        if data.len() != "YYYYMMDDHHMMSSZ".len() || data[14] != b'Z' {
            return Err(Malformed.into());
        }

        let year = u32::from(digits(&data, 0)?) * 100 + u32::from(digits(&data, 2)?);

        build_datetime(
            year as i32,
            digits(&data, 4)?,
            digits(&data, 6)?,
            digits(&data, 8)?,
            digits(&data, 10)?,
            digits(&data, 12)?,
        )
        .map(Self)
        .ok_or_else(|| Malformed.into())
    }
}

impl fmt::Display for GeneralizedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}{:02}{:02}{:02}Z",
            self.0.year(),
            self.0.month(),
            self.0.day(),
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        "YYYYMMDDHHMMSSZ".len()
    }

    fn write_encoded<W: Write>(&self, _: Mode, target: &mut W) -> Result<(), std::io::Error> {
        target.write_all(self.to_string().as_bytes())
    }
}

/// Two ASCII digits at `offset`, or a malformed error.
fn digits<E: From<bcder::decode::Error>>(data: &[u8], offset: usize) -> Result<u8, E> {
    let hi = data[offset];
    let lo = data[offset + 1];
    if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
        return Err(Malformed.into());
    }
    Ok((hi - b'0') * 10 + (lo - b'0'))
}

fn build_datetime(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> Option<chrono::DateTime<chrono::Utc>> {
    if let chrono::LocalResult::Single(date) =
        chrono::Utc.ymd_opt(year, u32::from(month), u32::from(day))
    {
        date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))
    } else {
        None
    }
}
