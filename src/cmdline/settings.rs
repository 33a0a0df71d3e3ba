//! `:set` option storage: a typed value, a descriptor table mapping names
//! (and short aliases) to setters, and unique-prefix lookup the same way
//! the command-line layer resolves option names.
//!
//! Grounded on the settings descriptor shape (`SettingValue`/`SettingType`/
//! `SettingDescriptor<T>` with a plain setter function pointer), stripped
//! of the color-setting variant this editor has no use for.

use crate::buffer::slab::LoadMethod;
use crate::document::SaveMethod;

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Integer(usize),
    Enum(String),
}

#[derive(Debug, Clone)]
pub enum SettingType {
    Boolean,
    Integer { min: Option<usize>, max: Option<usize> },
    Enum { variants: &'static [&'static str] },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    ParseError(String),
    ValidationError(String),
    UnknownOption(String),
}

impl std::fmt::Display for SettingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseError(m) => write!(f, "parse error: {m}"),
            Self::ValidationError(m) => write!(f, "validation error: {m}"),
            Self::UnknownOption(n) => write!(f, "unknown option: {n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Horizontal,
    Vertical,
}

pub struct Options {
    pub shell: String,
    pub escdelay: usize,
    pub autoindent: bool,
    pub expandtab: bool,
    pub tabwidth: usize,
    pub show_spaces: bool,
    pub show_tabs: bool,
    pub show_newlines: bool,
    pub show_eof: bool,
    pub numbers: bool,
    pub relativenumbers: bool,
    pub cursorline: bool,
    pub colorcolumn: usize,
    pub savemethod: SaveMethod,
    pub loadmethod: LoadMethod,
    pub layout: Layout,
    pub ignorecase: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            escdelay: 50,
            autoindent: false,
            expandtab: false,
            tabwidth: 8,
            show_spaces: false,
            show_tabs: false,
            show_newlines: false,
            show_eof: false,
            numbers: false,
            relativenumbers: false,
            cursorline: false,
            colorcolumn: 0,
            savemethod: SaveMethod::Atomic,
            loadmethod: LoadMethod::Auto,
            layout: Layout::Horizontal,
            ignorecase: false,
        }
    }
}

pub type Setter = fn(&mut Options, SettingValue) -> Result<(), SettingError>;

pub struct Descriptor {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub ty: SettingType,
    pub set: Setter,
}

macro_rules! bool_setter {
    ($field:ident) => {{
        fn setter(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
            match v {
                SettingValue::Bool(b) => {
                    opts.$field = b;
                    Ok(())
                }
                _ => Err(SettingError::ParseError("expected boolean".into())),
            }
        }
        setter
    }};
}

fn set_tabwidth(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Integer(n) if (1..=32).contains(&n) => {
            opts.tabwidth = n;
            Ok(())
        }
        SettingValue::Integer(n) => Err(SettingError::ValidationError(format!("tabwidth {n} out of range 1..=32"))),
        _ => Err(SettingError::ParseError("expected integer".into())),
    }
}

fn set_escdelay(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Integer(n) => {
            opts.escdelay = n;
            Ok(())
        }
        _ => Err(SettingError::ParseError("expected integer".into())),
    }
}

fn set_colorcolumn(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Integer(n) => {
            opts.colorcolumn = n;
            Ok(())
        }
        _ => Err(SettingError::ParseError("expected integer".into())),
    }
}

fn set_savemethod(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Enum(s) => {
            opts.savemethod = match s.as_str() {
                "atomic" => SaveMethod::Atomic,
                "inplace" => SaveMethod::InPlace,
                "auto" => SaveMethod::Atomic,
                other => return Err(SettingError::ValidationError(format!("unknown savemethod {other}"))),
            };
            Ok(())
        }
        _ => Err(SettingError::ParseError("expected enum".into())),
    }
}

fn set_loadmethod(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Enum(s) => {
            opts.loadmethod = match s.as_str() {
                "auto" => LoadMethod::Auto,
                "read" => LoadMethod::Read,
                "mmap" => LoadMethod::Mmap,
                other => return Err(SettingError::ValidationError(format!("unknown loadmethod {other}"))),
            };
            Ok(())
        }
        _ => Err(SettingError::ParseError("expected enum".into())),
    }
}

fn set_layout(opts: &mut Options, v: SettingValue) -> Result<(), SettingError> {
    match v {
        SettingValue::Enum(s) => {
            opts.layout = match s.as_str() {
                "h" => Layout::Horizontal,
                "v" => Layout::Vertical,
                other => return Err(SettingError::ValidationError(format!("unknown layout {other}"))),
            };
            Ok(())
        }
        _ => Err(SettingError::ParseError("expected enum".into())),
    }
}

pub static DESCRIPTORS: &[Descriptor] = &[
    Descriptor { name: "autoindent", aliases: &["ai"], ty: SettingType::Boolean, set: bool_setter!(autoindent) },
    Descriptor { name: "expandtab", aliases: &["et"], ty: SettingType::Boolean, set: bool_setter!(expandtab) },
    Descriptor { name: "tabwidth", aliases: &["tw"], ty: SettingType::Integer { min: Some(1), max: Some(32) }, set: set_tabwidth },
    Descriptor { name: "show-spaces", aliases: &[], ty: SettingType::Boolean, set: bool_setter!(show_spaces) },
    Descriptor { name: "show-tabs", aliases: &[], ty: SettingType::Boolean, set: bool_setter!(show_tabs) },
    Descriptor { name: "show-newlines", aliases: &[], ty: SettingType::Boolean, set: bool_setter!(show_newlines) },
    Descriptor { name: "show-eof", aliases: &[], ty: SettingType::Boolean, set: bool_setter!(show_eof) },
    Descriptor { name: "numbers", aliases: &["nu"], ty: SettingType::Boolean, set: bool_setter!(numbers) },
    Descriptor { name: "relativenumbers", aliases: &["rnu"], ty: SettingType::Boolean, set: bool_setter!(relativenumbers) },
    Descriptor { name: "cursorline", aliases: &["cul"], ty: SettingType::Boolean, set: bool_setter!(cursorline) },
    Descriptor { name: "colorcolumn", aliases: &["cc"], ty: SettingType::Integer { min: Some(0), max: None }, set: set_colorcolumn },
    Descriptor { name: "savemethod", aliases: &[], ty: SettingType::Enum { variants: &["auto", "atomic", "inplace"] }, set: set_savemethod },
    Descriptor { name: "loadmethod", aliases: &[], ty: SettingType::Enum { variants: &["auto", "read", "mmap"] }, set: set_loadmethod },
    Descriptor { name: "layout", aliases: &[], ty: SettingType::Enum { variants: &["h", "v"] }, set: set_layout },
    Descriptor { name: "ignorecase", aliases: &["ic"], ty: SettingType::Boolean, set: bool_setter!(ignorecase) },
    Descriptor { name: "escdelay", aliases: &[], ty: SettingType::Integer { min: Some(0), max: None }, set: set_escdelay },
];

fn find_descriptor(name: &str) -> Option<&'static Descriptor> {
    let mut hit = None;
    for d in DESCRIPTORS {
        if d.name == name || d.aliases.contains(&name) {
            return Some(d);
        }
        if d.name.starts_with(name) {
            if hit.is_some() {
                return None;
            }
            hit = Some(d);
        }
    }
    hit
}

fn parse_value(ty: &SettingType, raw: &str) -> Result<SettingValue, SettingError> {
    match ty {
        SettingType::Boolean => match raw {
            "true" | "on" | "yes" | "1" => Ok(SettingValue::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(SettingValue::Bool(false)),
            other => Err(SettingError::ParseError(format!("not a boolean: {other}"))),
        },
        SettingType::Integer { min, max } => {
            let n: usize = raw.parse().map_err(|_| SettingError::ParseError(format!("not an integer: {raw}")))?;
            if let Some(min) = min {
                if n < *min {
                    return Err(SettingError::ValidationError(format!("{n} below minimum {min}")));
                }
            }
            if let Some(max) = max {
                if n > *max {
                    return Err(SettingError::ValidationError(format!("{n} above maximum {max}")));
                }
            }
            Ok(SettingValue::Integer(n))
        }
        SettingType::Enum { variants } => {
            if variants.contains(&raw) {
                Ok(SettingValue::Enum(raw.to_string()))
            } else {
                Err(SettingError::ValidationError(format!("{raw} not one of {variants:?}")))
            }
        }
    }
}

/// `:set name [value]`. A boolean option with no value toggles it on (the
/// `:set et` shorthand); every other type requires an explicit value.
pub fn apply(opts: &mut Options, name: &str, value: Option<&str>) -> Result<(), SettingError> {
    let d = find_descriptor(name).ok_or_else(|| SettingError::UnknownOption(name.to_string()))?;
    let parsed = match (value, &d.ty) {
        (Some(raw), ty) => parse_value(ty, raw)?,
        (None, SettingType::Boolean) => SettingValue::Bool(true),
        (None, _) => return Err(SettingError::ParseError(format!("{} requires a value", d.name))),
    };
    (d.set)(opts, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_prefix_and_alias_both_resolve() {
        let mut opts = Options::default();
        apply(&mut opts, "et", Some("true")).unwrap();
        assert!(opts.expandtab);
        apply(&mut opts, "expandtab", Some("false")).unwrap();
        assert!(!opts.expandtab);
    }

    #[test]
    fn boolean_with_no_value_toggles_on() {
        let mut opts = Options::default();
        apply(&mut opts, "numbers", None).unwrap();
        assert!(opts.numbers);
    }

    #[test]
    fn tabwidth_rejects_out_of_range() {
        let mut opts = Options::default();
        let err = apply(&mut opts, "tabwidth", Some("99")).unwrap_err();
        assert!(matches!(err, SettingError::ValidationError(_)));
    }

    #[test]
    fn savemethod_enum_round_trips() {
        let mut opts = Options::default();
        apply(&mut opts, "savemethod", Some("inplace")).unwrap();
        assert_eq!(opts.savemethod, SaveMethod::InPlace);
    }

    #[test]
    fn unknown_option_is_an_error() {
        let mut opts = Options::default();
        let err = apply(&mut opts, "bogus", Some("1")).unwrap_err();
        assert_eq!(err, SettingError::UnknownOption("bogus".to_string()));
    }
}
