//! Runtime support generator.
//!
//! Each output directory gets at most one `_proto_types.py` holding the
//! codecs and validators its generated files import. The module is assembled
//! symbol by symbol: a symbol pulls in its own imports and private helpers,
//! and nothing unreferenced is emitted.

use std::collections::BTreeSet;

use crate::gen_python::format_import_block;

pub const RUNTIME_MODULE: &str = "_proto_types";

/// A name generated files may import from the runtime module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuntimeSymbol {
    ProtoInt64,
    ProtoUInt64,
    ProtoTimestamp,
    ProtoDuration,
    RequireUnique,
    MakeInValidator,
    MakeNotInValidator,
    ValidateEmail,
    ValidateUri,
    ValidateIp,
    ValidateIpv4,
    ValidateIpv6,
    ValidateUuid,
    RequireFinite,
    MakeConstValidator,
}

impl RuntimeSymbol {
    pub fn name(self) -> &'static str {
        match self {
            RuntimeSymbol::ProtoInt64 => "ProtoInt64",
            RuntimeSymbol::ProtoUInt64 => "ProtoUInt64",
            RuntimeSymbol::ProtoTimestamp => "ProtoTimestamp",
            RuntimeSymbol::ProtoDuration => "ProtoDuration",
            RuntimeSymbol::RequireUnique => "_require_unique",
            RuntimeSymbol::MakeInValidator => "_make_in_validator",
            RuntimeSymbol::MakeNotInValidator => "_make_not_in_validator",
            RuntimeSymbol::ValidateEmail => "_validate_email",
            RuntimeSymbol::ValidateUri => "_validate_uri",
            RuntimeSymbol::ValidateIp => "_validate_ip",
            RuntimeSymbol::ValidateIpv4 => "_validate_ipv4",
            RuntimeSymbol::ValidateIpv6 => "_validate_ipv6",
            RuntimeSymbol::ValidateUuid => "_validate_uuid",
            RuntimeSymbol::RequireFinite => "_require_finite",
            RuntimeSymbol::MakeConstValidator => "_make_const_validator",
        }
    }

    /// Format validator for a `buf.validate` string format rule.
    pub fn format_validator(rule: &str) -> Option<Self> {
        Some(match rule {
            "email" => RuntimeSymbol::ValidateEmail,
            "uri" => RuntimeSymbol::ValidateUri,
            "ip" => RuntimeSymbol::ValidateIp,
            "ipv4" => RuntimeSymbol::ValidateIpv4,
            "ipv6" => RuntimeSymbol::ValidateIpv6,
            "uuid" => RuntimeSymbol::ValidateUuid,
            _ => return None,
        })
    }

    fn imports(self) -> &'static [Import] {
        use Import::*;
        match self {
            RuntimeSymbol::ProtoInt64 | RuntimeSymbol::ProtoUInt64 => {
                &[Annotated, BeforeValidator, PlainSerializer]
            }
            RuntimeSymbol::ProtoTimestamp | RuntimeSymbol::ProtoDuration => {
                &[Datetime, Re, Annotated, BeforeValidator, PlainSerializer]
            }
            RuntimeSymbol::ValidateUri => &[AnyUrl, TypeAdapter],
            RuntimeSymbol::ValidateIp | RuntimeSymbol::ValidateIpv4 | RuntimeSymbol::ValidateIpv6 => {
                &[Ipaddress]
            }
            RuntimeSymbol::ValidateUuid => &[Uuid],
            RuntimeSymbol::RequireFinite => &[Math],
            _ => &[],
        }
    }

    fn helpers(self) -> &'static [Helper] {
        match self {
            RuntimeSymbol::ProtoInt64 | RuntimeSymbol::ProtoUInt64 => &[Helper::CoerceInt],
            RuntimeSymbol::ValidateUri => &[Helper::UrlAdapter],
            _ => &[],
        }
    }

    fn body(self) -> &'static str {
        match self {
            RuntimeSymbol::ProtoInt64 => PROTO_INT64,
            RuntimeSymbol::ProtoUInt64 => PROTO_UINT64,
            RuntimeSymbol::ProtoTimestamp => PROTO_TIMESTAMP,
            RuntimeSymbol::ProtoDuration => PROTO_DURATION,
            RuntimeSymbol::RequireUnique => REQUIRE_UNIQUE,
            RuntimeSymbol::MakeInValidator => MAKE_IN_VALIDATOR,
            RuntimeSymbol::MakeNotInValidator => MAKE_NOT_IN_VALIDATOR,
            RuntimeSymbol::ValidateEmail => VALIDATE_EMAIL,
            RuntimeSymbol::ValidateUri => VALIDATE_URI,
            RuntimeSymbol::ValidateIp => VALIDATE_IP,
            RuntimeSymbol::ValidateIpv4 => VALIDATE_IPV4,
            RuntimeSymbol::ValidateIpv6 => VALIDATE_IPV6,
            RuntimeSymbol::ValidateUuid => VALIDATE_UUID,
            RuntimeSymbol::RequireFinite => REQUIRE_FINITE,
            RuntimeSymbol::MakeConstValidator => MAKE_CONST_VALIDATOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Import {
    Datetime,
    Ipaddress,
    Math,
    Re,
    Uuid,
    Annotated,
    AnyUrl,
    BeforeValidator,
    PlainSerializer,
    TypeAdapter,
}

impl Import {
    fn is_stdlib_module(self) -> bool {
        matches!(self, Import::Datetime | Import::Ipaddress | Import::Math | Import::Re | Import::Uuid)
    }

    fn statement(self) -> &'static str {
        match self {
            Import::Datetime => "import datetime as _datetime",
            Import::Ipaddress => "import ipaddress as _ipaddress",
            Import::Math => "import math as _math",
            Import::Re => "import re as _re",
            Import::Uuid => "import uuid as _uuid_lib",
            Import::Annotated => "Annotated as _Annotated",
            Import::AnyUrl => "AnyUrl as _AnyUrl",
            Import::BeforeValidator => "BeforeValidator as _BeforeValidator",
            Import::PlainSerializer => "PlainSerializer as _PlainSerializer",
            Import::TypeAdapter => "TypeAdapter as _TypeAdapter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Helper {
    UrlAdapter,
    CoerceInt,
}

impl Helper {
    fn body(self) -> &'static str {
        match self {
            Helper::UrlAdapter => "_url_adapter = _TypeAdapter(_AnyUrl)\n",
            Helper::CoerceInt => COERCE_INT,
        }
    }
}

/// Renders `_proto_types.py` for one directory, or `None` when no symbol is
/// referenced there.
pub fn render_runtime_module(symbols: &BTreeSet<RuntimeSymbol>) -> Option<String> {
    if symbols.is_empty() {
        return None;
    }

    let imports: BTreeSet<Import> = symbols.iter().flat_map(|s| s.imports().iter().copied()).collect();
    let helpers: BTreeSet<Helper> = symbols.iter().flat_map(|s| s.helpers().iter().copied()).collect();

    let mut out = String::from("# DO NOT EDIT. Generated by protoc-gen-pydantic.\n");

    // 1) stdlib: plain module imports, then `typing`
    let mut stdlib: Vec<&str> = imports
        .iter()
        .filter(|i| i.is_stdlib_module())
        .map(|i| i.statement())
        .collect();
    let typing = imports.contains(&Import::Annotated);
    if typing {
        stdlib.push("from typing import Annotated as _Annotated");
    }
    for line in &stdlib {
        out.push_str(line);
        out.push('\n');
    }

    // 2) pydantic
    let pydantic: Vec<String> = imports
        .iter()
        .filter(|i| !i.is_stdlib_module() && **i != Import::Annotated)
        .map(|i| i.statement().to_string())
        .collect();
    if !pydantic.is_empty() {
        if !stdlib.is_empty() {
            out.push('\n');
        }
        out.push_str(&format_import_block("from pydantic import ", &pydantic));
        out.push('\n');
    }

    // 3) helpers, then one block per symbol, each separated by two blank lines
    let blocks = helpers
        .iter()
        .map(|h| h.body())
        .chain(symbols.iter().map(|s| s.body()));
    for block in blocks {
        out.push_str("\n\n");
        out.push_str(block);
    }

    Some(out)
}

const COERCE_INT: &str = r#"def _coerce_int(v):
    if isinstance(v, str):
        return int(v)
    return v
"#;

const PROTO_INT64: &str = r#"ProtoInt64 = _Annotated[
    int,
    _BeforeValidator(_coerce_int),
    _PlainSerializer(lambda v: str(v), return_type=str, when_used="json"),
]
"#;

const PROTO_UINT64: &str = r#"ProtoUInt64 = _Annotated[
    int,
    _BeforeValidator(_coerce_int),
    _PlainSerializer(lambda v: str(v), return_type=str, when_used="json"),
]
"#;

const PROTO_TIMESTAMP: &str = r#"_TIMESTAMP_FRACTION = _re.compile(r"\.(\d+)")


def _parse_timestamp(v):
    if isinstance(v, _datetime.datetime):
        return v
    if isinstance(v, str):
        text = v.replace("Z", "+00:00")
        text = _TIMESTAMP_FRACTION.sub(
            lambda m: "." + m.group(1)[:6].ljust(6, "0"), text, count=1
        )
        return _datetime.datetime.fromisoformat(text)
    raise ValueError(f"Cannot parse timestamp from {type(v)}")


def _serialize_timestamp(v):
    if v.tzinfo is None:
        v = v.replace(tzinfo=_datetime.timezone.utc)
    v = v.astimezone(_datetime.timezone.utc)
    s = (
        f"{v.year:04d}-{v.month:02d}-{v.day:02d}"
        f"T{v.hour:02d}:{v.minute:02d}:{v.second:02d}"
    )
    if v.microsecond:
        s += f".{v.microsecond:06d}".rstrip("0")
    return s + "Z"


ProtoTimestamp = _Annotated[
    _datetime.datetime,
    _BeforeValidator(_parse_timestamp),
    _PlainSerializer(_serialize_timestamp, return_type=str, when_used="json"),
]
"#;

const PROTO_DURATION: &str = r#"_DURATION = _re.compile(r"^(-)?(\d+)(?:\.(\d{1,9}))?s$")


def _parse_duration(v):
    if isinstance(v, _datetime.timedelta):
        return v
    if isinstance(v, str):
        m = _DURATION.match(v)
        if not m:
            raise ValueError(f"Invalid duration: {v}")
        sign, seconds, fraction = m.groups()
        micros = int((fraction or "").ljust(9, "0")[:6])
        d = _datetime.timedelta(seconds=int(seconds), microseconds=micros)
        return -d if sign else d
    raise ValueError(f"Cannot parse duration from {type(v)}")


def _serialize_duration(v):
    sign = "-" if v < _datetime.timedelta(0) else ""
    v = abs(v)
    seconds = v.days * 86400 + v.seconds
    if v.microseconds:
        return f"{sign}{seconds}.{v.microseconds:06d}".rstrip("0") + "s"
    return f"{sign}{seconds}s"


ProtoDuration = _Annotated[
    _datetime.timedelta,
    _BeforeValidator(_parse_duration),
    _PlainSerializer(_serialize_duration, return_type=str, when_used="json"),
]
"#;

const REQUIRE_UNIQUE: &str = r#"def _require_unique(v):
    if len(v) != len(set(v)):
        raise ValueError("list items must be unique")
    return v
"#;

const MAKE_IN_VALIDATOR: &str = r#"def _make_in_validator(valid_values):
    def _validate(v):
        if v not in valid_values:
            raise ValueError(f"value must be one of {sorted(valid_values)}")
        return v

    return _validate
"#;

const MAKE_NOT_IN_VALIDATOR: &str = r#"def _make_not_in_validator(excluded_values):
    def _validate(v):
        if v in excluded_values:
            raise ValueError(f"value must not be one of {sorted(excluded_values)}")
        return v

    return _validate
"#;

const VALIDATE_EMAIL: &str = r#"def _validate_email(v: str) -> str:
    if not v:
        return v
    from pydantic.networks import validate_email as _pydantic_validate_email

    _pydantic_validate_email(v)
    return v
"#;

const VALIDATE_URI: &str = r#"def _validate_uri(v: str) -> str:
    if not v:
        return v
    _url_adapter.validate_python(v)
    return v
"#;

const VALIDATE_IP: &str = r#"def _validate_ip(v: str) -> str:
    if not v:
        return v
    _ipaddress.ip_address(v)
    return v
"#;

const VALIDATE_IPV4: &str = r#"def _validate_ipv4(v: str) -> str:
    if not v:
        return v
    _ipaddress.IPv4Address(v)
    return v
"#;

const VALIDATE_IPV6: &str = r#"def _validate_ipv6(v: str) -> str:
    if not v:
        return v
    _ipaddress.IPv6Address(v)
    return v
"#;

const VALIDATE_UUID: &str = r#"def _validate_uuid(v: str) -> str:
    if not v:
        return v
    _uuid_lib.UUID(v)
    return v
"#;

const REQUIRE_FINITE: &str = r#"def _require_finite(v: float) -> float:
    if not _math.isfinite(v):
        raise ValueError("value must be finite")
    return v
"#;

const MAKE_CONST_VALIDATOR: &str = r#"def _make_const_validator(c):
    def _validate(v):
        if v != c:
            raise ValueError(f"value must equal {c!r}")
        return v

    return _validate
"#;
