//! Declaration and request parser using nom.
//!
//! # Syntax Overview
//!
//! ```text
//! Manager: Employee, Auditable              subtype, parents in lookup order
//! enum OrderStatus by ordinal { A, B, C }   enum stored by ordinal
//! enum Color { Red, Green }                 enum stored by name (default)
//!
//! Invoice@VARCHAR    Invoice    @INTEGER    resolution requests
//! ```

use std::collections::HashSet;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult, Offset,
};

use crate::error::{BindError, BindResult};
use crate::value::AppType;
use crate::wire::WireType;

/// How a declared enum is stored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStorage {
    Name,
    Ordinal,
}

/// A type declaration from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Subtype {
        name: AppType,
        parents: Vec<AppType>,
    },
    Enum {
        name: AppType,
        storage: EnumStorage,
        variants: Vec<String>,
    },
}

/// A resolution request: `Type@TAG`, `Type` or `@TAG`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub app_type: Option<AppType>,
    pub wire_type: Option<WireType>,
}

/// Parse a subtype or enum declaration.
pub fn parse_declaration(input: &str) -> BindResult<Declaration> {
    let input = input.trim();
    let declaration = finish(input, parse_decl(input))?;

    if let Declaration::Enum { variants, .. } = &declaration {
        let mut seen = HashSet::new();
        if let Some(dup) = variants.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(BindError::parse(
                input.rfind(dup.as_str()).unwrap_or(0),
                format!("Duplicate variant '{}'", dup),
            ));
        }
    }
    Ok(declaration)
}

/// Parse a resolution request.
pub fn parse_request(input: &str) -> BindResult<Request> {
    let input = input.trim();
    let (app_type, wire_name) = finish(input, parse_raw_request(input))?;

    let wire_type = match wire_name {
        Some(name) => Some(WireType::from_str(name).map_err(|_| {
            BindError::parse(input.offset(name), format!("Unknown wire type '{}'", name))
        })?),
        None => None,
    };
    Ok(Request {
        app_type: app_type.map(AppType::new),
        wire_type,
    })
}

fn finish<'a, T>(input: &'a str, result: IResult<&'a str, T>) -> BindResult<T> {
    match result {
        Ok(("", out)) => Ok(out),
        Ok((remaining, _)) => Err(BindError::parse(
            input.offset(remaining),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) if e.input.is_empty() => {
            Err(BindError::parse(input.len(), "Unexpected end of input"))
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(BindError::parse(
            input.offset(e.input),
            format!("Unexpected input: '{}'", e.input),
        )),
        Err(nom::Err::Incomplete(_)) => Err(BindError::parse(input.len(), "Unexpected end of input")),
    }
}

fn parse_decl(input: &str) -> IResult<&str, Declaration> {
    alt((parse_enum, parse_subtype))(input)
}

/// `enum Name [by name|by ordinal] { A, B }`
fn parse_enum(input: &str) -> IResult<&str, Declaration> {
    let (input, _) = terminated(tag("enum"), multispace1)(input)?;
    let (input, name) = parse_type_name(input)?;
    let (input, storage) = opt(preceded(multispace1, parse_storage))(input)?;
    let (input, _) = ws(char('{'))(input)?;
    let (input, variants) = separated_list1(ws(char(',')), parse_identifier)(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = ws(char('}'))(input)?;

    Ok((
        input,
        Declaration::Enum {
            name: AppType::new(name),
            storage: storage.unwrap_or(EnumStorage::Name),
            variants: variants.into_iter().map(str::to_string).collect(),
        },
    ))
}

fn parse_storage(input: &str) -> IResult<&str, EnumStorage> {
    preceded(
        pair(tag("by"), multispace1),
        alt((
            value(EnumStorage::Ordinal, tag("ordinal")),
            value(EnumStorage::Name, tag("name")),
        )),
    )(input)
}

/// `Child: ParentA, ParentB`
fn parse_subtype(input: &str) -> IResult<&str, Declaration> {
    map(
        tuple((
            parse_type_name,
            ws(char(':')),
            separated_list1(ws(char(',')), parse_type_name),
        )),
        |(name, _, parents)| Declaration::Subtype {
            name: AppType::new(name),
            parents: parents.into_iter().map(AppType::new).collect(),
        },
    )(input)
}

fn parse_raw_request(input: &str) -> IResult<&str, (Option<&str>, Option<&str>)> {
    alt((
        map(preceded(char('@'), parse_identifier), |w| (None, Some(w))),
        pair(
            map(parse_type_name, Some),
            opt(preceded(ws(char('@')), parse_identifier)),
        ),
    ))(input)
}

/// Application type name; dots allow module-qualified names.
fn parse_type_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.')(input)
}

fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_keeps_parent_order() {
        let decl = parse_declaration("Manager: Employee, Auditable").unwrap();
        assert_eq!(
            decl,
            Declaration::Subtype {
                name: AppType::new("Manager"),
                parents: vec![AppType::new("Employee"), AppType::new("Auditable")],
            }
        );
    }

    #[test]
    fn test_qualified_type_names() {
        let decl = parse_declaration("billing.Invoice : core.Document").unwrap();
        assert!(matches!(
            decl,
            Declaration::Subtype { name, .. } if name == AppType::new("billing.Invoice")
        ));
    }

    #[test]
    fn test_enum_defaults_to_name_storage() {
        let decl = parse_declaration("enum Color { Red, Green, }").unwrap();
        assert_eq!(
            decl,
            Declaration::Enum {
                name: AppType::new("Color"),
                storage: EnumStorage::Name,
                variants: vec!["Red".to_string(), "Green".to_string()],
            }
        );
    }

    #[test]
    fn test_enum_by_ordinal() {
        let decl = parse_declaration("enum OrderStatus by ordinal {Pending,Shipped}").unwrap();
        assert!(matches!(
            decl,
            Declaration::Enum { storage: EnumStorage::Ordinal, ref variants, .. } if variants.len() == 2
        ));
    }

    #[test]
    fn test_enum_rejects_duplicates_and_empty_body() {
        let err = parse_declaration("enum Color { Red, Red }").unwrap_err();
        assert!(err.to_string().contains("Duplicate variant 'Red'"));
        assert!(parse_declaration("enum Color { }").is_err());
    }

    #[test]
    fn test_trailing_content_reports_position() {
        let err = parse_declaration("A: B C").unwrap_err();
        assert!(matches!(err, BindError::Parse { position: 4, .. }));
    }

    #[test]
    fn test_request_forms() {
        assert_eq!(
            parse_request("Invoice@VARCHAR").unwrap(),
            Request {
                app_type: Some(AppType::new("Invoice")),
                wire_type: Some(WireType::Varchar),
            }
        );
        assert_eq!(
            parse_request("i64").unwrap(),
            Request {
                app_type: Some(AppType::I64),
                wire_type: None,
            }
        );
        assert_eq!(
            parse_request("@int4").unwrap(),
            Request {
                app_type: None,
                wire_type: Some(WireType::Integer),
            }
        );
    }

    #[test]
    fn test_unknown_wire_type() {
        let err = parse_request("Invoice@FOO").unwrap_err();
        assert!(matches!(err, BindError::Parse { position: 8, .. }));
    }
}
