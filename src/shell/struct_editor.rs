//! Struct editor (spec.md §4.L): parses a schema file describing
//! packed C-like structs and computes member offsets/sizes for the
//! `struct.NAME.MBR[=VALUE]` CLI form (grounded on
//! `original_source/main/common/struct.c`).

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

pub const PTR_SIZE: u32 = 4;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StructError {
    #[error("unknown struct '{0}'")]
    NoSuchStruct(String),
    #[error("'{0}' has no member '{1}'")]
    NoSuchMember(String, String),
    #[error("malformed schema line: {0}")]
    MalformedLine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    Long,
    Short,
    Char,
    Struct(String),
}

impl MemberType {
    fn base_size(&self, schema: &Schema) -> Option<u32> {
        match self {
            MemberType::Long => Some(4),
            MemberType::Short => Some(2),
            MemberType::Char => Some(1),
            MemberType::Struct(name) => schema.size_of(name).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: MemberType,
    pub array_len: Option<u32>,
    pub is_pointer: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StructDef {
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    structs: BTreeMap<String, StructDef>,
}

fn parse_type(token: &str) -> Option<(bool, &str)> {
    if let Some(rest) = token.strip_prefix('*') {
        Some((true, rest))
    } else {
        Some((false, token))
    }
}

impl Schema {
    /// Parse the `struct NAME { ... };` blocks that make up a schema
    /// file (spec.md §4.L).
    pub fn parse(text: &str) -> Result<Self, StructError> {
        let mut schema = Schema::default();
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        while let Some(line) = lines.next() {
            let Some(rest) = line.strip_prefix("struct ") else {
                continue;
            };
            let name = rest.trim_end_matches('{').trim().to_string();
            let mut members = Vec::new();
            for member_line in &mut lines {
                let member_line = member_line.trim();
                if member_line.starts_with('}') {
                    break;
                }
                members.push(parse_member(member_line)?);
            }
            schema.structs.insert(name, StructDef { members });
        }
        Ok(schema)
    }

    pub fn size_of(&self, name: &str) -> Result<u32, StructError> {
        let def = self.structs.get(name).ok_or_else(|| StructError::NoSuchStruct(name.to_string()))?;
        let mut total = 0;
        for m in &def.members {
            total += member_size(self, m)?;
        }
        Ok(total)
    }

    /// Offset and size of `member` within `struct_name` (packed, no
    /// padding, per spec.md §4.L).
    pub fn offset_of(&self, struct_name: &str, member: &str) -> Result<(u32, u32), StructError> {
        let def = self.structs.get(struct_name).ok_or_else(|| StructError::NoSuchStruct(struct_name.to_string()))?;
        let mut offset = 0;
        for m in &def.members {
            let size = member_size(self, m)?;
            if m.name == member {
                return Ok((offset, size));
            }
            offset += size;
        }
        Err(StructError::NoSuchMember(struct_name.to_string(), member.to_string()))
    }
}

fn member_size(schema: &Schema, m: &Member) -> Result<u32, StructError> {
    let base = if m.is_pointer {
        PTR_SIZE
    } else {
        m.ty.base_size(schema).ok_or_else(|| match &m.ty {
            MemberType::Struct(s) => StructError::NoSuchStruct(s.clone()),
            _ => StructError::MalformedLine(m.name.clone()),
        })?
    };
    Ok(base * m.array_len.unwrap_or(1))
}

fn parse_member(line: &str) -> Result<Member, StructError> {
    let line = line.trim_end_matches(';').trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let first = parts.next().ok_or_else(|| StructError::MalformedLine(line.to_string()))?;
    let rest = parts.next().unwrap_or("").trim();

    let (ty, name_part) = if first == "struct" {
        let mut rest_parts = rest.splitn(2, char::is_whitespace);
        let struct_name = rest_parts.next().ok_or_else(|| StructError::MalformedLine(line.to_string()))?;
        let name_part = rest_parts.next().unwrap_or("").trim();
        (MemberType::Struct(struct_name.to_string()), name_part)
    } else {
        let ty = match first {
            "long" => MemberType::Long,
            "short" => MemberType::Short,
            "char" => MemberType::Char,
            other => return Err(StructError::MalformedLine(other.to_string())),
        };
        (ty, rest)
    };

    let (is_pointer, name_part) = parse_type(name_part).ok_or_else(|| StructError::MalformedLine(line.to_string()))?;
    let (name, array_len) = if let Some(bracket) = name_part.find('[') {
        let name = name_part[..bracket].to_string();
        let len_str = name_part[bracket + 1..].trim_end_matches(']');
        let len = len_str.parse().map_err(|_| StructError::MalformedLine(line.to_string()))?;
        (name, Some(len))
    } else {
        (name_part.to_string(), None)
    };

    Ok(Member { name, ty, array_len, is_pointer })
}

/// The pseudo-function value forms on the right of `struct.mbr=VALUE`
/// (spec.md §4.L).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    Literal(i64),
    SizeOf(String),
    StrCpy(String),
    StrCat(String),
    MemCpy(String, u32),
    IpToBin([u8; 4]),
    EtherToBin([u8; 6]),
    TagSize(String, String),
}

pub fn parse_value(expr: &str) -> Option<ValueExpr> {
    let expr = expr.trim();
    if let Some(hex) = expr.strip_prefix("0x").or_else(|| expr.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(ValueExpr::Literal);
    }
    if let Ok(n) = expr.parse::<i64>() {
        return Some(ValueExpr::Literal(n));
    }
    if let Some(inner) = strip_call(expr, "sizeof") {
        return Some(ValueExpr::SizeOf(inner.to_string()));
    }
    if let Some(inner) = strip_call(expr, "strcpy") {
        return Some(ValueExpr::StrCpy(inner.to_string()));
    }
    if let Some(inner) = strip_call(expr, "strcat") {
        return Some(ValueExpr::StrCat(inner.to_string()));
    }
    if let Some(inner) = strip_call(expr, "memcpy") {
        let (src, n) = inner.split_once(',')?;
        return Some(ValueExpr::MemCpy(src.trim().to_string(), n.trim().parse().ok()?));
    }
    if let Some(inner) = strip_call(expr, "i2l") {
        return parse_dotted_ip(inner.trim()).map(ValueExpr::IpToBin);
    }
    if let Some(inner) = strip_call(expr, "e2b") {
        return parse_mac(inner.trim()).map(ValueExpr::EtherToBin);
    }
    if let Some(inner) = strip_call(expr, "tagsiz") {
        let (a, b) = inner.split_once(',')?;
        return Some(ValueExpr::TagSize(a.trim().to_string(), b.trim().to_string()));
    }
    None
}

fn strip_call<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    let rest = expr.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner)
}

fn parse_dotted_ip(s: &str) -> Option<[u8; 4]> {
    let mut out = [0u8; 4];
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    for (i, p) in parts.iter().enumerate() {
        out[i] = p.parse().ok()?;
    }
    Some(out)
}

fn parse_mac(s: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return None;
    }
    for (i, p) in parts.iter().enumerate() {
        out[i] = u8::from_str_radix(p, 16).ok()?;
    }
    Some(out)
}

/// `tagsiz(A,B)`: `(sizeof(A)+sizeof(B))/4` (spec.md §4.L).
pub fn tagsiz(schema: &Schema, a: &str, b: &str) -> Result<u32, StructError> {
    Ok((schema.size_of(a)? + schema.size_of(b)?) / 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "
struct mbr {
    long lba;
    short type;
    char flags[4];
    struct part p;
};
struct part {
    long base;
    long size;
};
";

    #[test]
    fn computes_packed_offsets() {
        let schema = Schema::parse(SCHEMA).unwrap();
        assert_eq!(schema.offset_of("mbr", "lba").unwrap(), (0, 4));
        assert_eq!(schema.offset_of("mbr", "type").unwrap(), (4, 2));
        assert_eq!(schema.offset_of("mbr", "flags").unwrap(), (6, 4));
        assert_eq!(schema.offset_of("mbr", "p").unwrap(), (10, 8));
        assert_eq!(schema.size_of("mbr").unwrap(), 18);
    }

    #[test]
    fn unknown_member_is_an_error() {
        let schema = Schema::parse(SCHEMA).unwrap();
        assert_eq!(
            schema.offset_of("mbr", "nope"),
            Err(StructError::NoSuchMember("mbr".into(), "nope".into()))
        );
    }

    #[test]
    fn parses_pseudo_function_values() {
        assert_eq!(parse_value("0x20"), Some(ValueExpr::Literal(0x20)));
        assert_eq!(parse_value("sizeof(mbr)"), Some(ValueExpr::SizeOf("mbr".into())));
        assert_eq!(parse_value("i2l(10.0.0.1)"), Some(ValueExpr::IpToBin([10, 0, 0, 1])));
        assert_eq!(
            parse_value("e2b(01:02:03:04:05:06)"),
            Some(ValueExpr::EtherToBin([1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(parse_value("tagsiz(mbr,part)"), Some(ValueExpr::TagSize("mbr".into(), "part".into())));
    }

    #[test]
    fn tagsiz_divides_combined_size_by_four() {
        let schema = Schema::parse(SCHEMA).unwrap();
        assert_eq!(tagsiz(&schema, "part", "part").unwrap(), 4);
    }
}
