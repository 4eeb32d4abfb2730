#![cfg(test)]

mod common;

use pretty_assertions::assert_eq;

use common::{generate, output};

const PERSON_PROTO: &str = r#"
syntax = "proto3";

package people;

import "buf/validate/validate.proto";

message Person {
  string name = 1 [(buf.validate.field).string = {min_len: 1, max_len: 64}];
  int32 age = 2 [(buf.validate.field).int32 = {gt: 0, lte: 150}];
  string code = 3 [(buf.validate.field).string = {pattern: "^[A-Z]+$", prefix: "AB"}];
  string email = 4 [(buf.validate.field).string.email = true];
  string id = 5 [(buf.validate.field).required = true];
  repeated string tags = 6 [(buf.validate.field).repeated = {unique: true, max_items: 5}];
  string kind = 7 [(buf.validate.field).string.const = "person"];
  double score = 8 [(buf.validate.field).double.finite = true];
}
"#;

#[test]
fn test_translated_constraints() {
    let files = generate(&[("people/person.proto", PERSON_PROTO)], None);
    let module = output(&files, "people/person_pydantic.py");

    // Bounds and lengths become Field arguments; a zero they reject is no default
    assert!(module.contains("    name: \"str\" = _Field(\n        min_length=1,\n        max_length=64,\n    )\n"));
    assert!(module.contains("    age: \"int\" = _Field(\n        gt=0,\n        le=150,\n    )\n"));

    // An explicit pattern wins over prefix, which is left as a comment
    assert!(module.contains(
        "    code: \"str\" = _Field(\n        pattern=\"^[A-Z]+$\",\n        # buf.validate: prefix (not translated)\n    )\n"
    ));

    // Rules without a native form stay visible
    assert!(module.contains(
        "    id_: \"str\" = _Field(\n        \"\",\n        alias=\"id\",\n        # buf.validate: required (not translated)\n    )\n"
    ));

    // Validators wrap the type
    assert!(module.contains("    email: \"_Annotated[str, _AfterValidator(_validate_email)]\" = _Field(\"\")\n"));
    assert!(module.contains(
        "    tags: \"_Annotated[list[str], _AfterValidator(_require_unique)]\" = _Field(\n        default_factory=list,\n        max_length=5,\n    )\n"
    ));
    assert!(module.contains("    score: \"_Annotated[float, _AfterValidator(_require_finite)]\" = _Field(0.0)\n"));

    // const narrows to a Literal and defaults to the constant
    assert!(module.contains("    kind: \"_Literal['person']\" = _Field(\"person\")\n"));
}

#[test]
fn test_constraint_imports_and_runtime() {
    let files = generate(&[("people/person.proto", PERSON_PROTO)], None);
    let module = output(&files, "people/person_pydantic.py");

    assert!(module.contains("from typing import Annotated as _Annotated, Literal as _Literal\n"));
    assert!(module.contains(
        "from pydantic import (\n    AfterValidator as _AfterValidator,\n    BaseModel as _BaseModel,\n    ConfigDict as _ConfigDict,\n    Field as _Field,\n)\n"
    ));
    assert!(module.contains("from ._proto_types import _require_finite, _require_unique, _validate_email\n"));

    // Only the referenced helpers are emitted
    let runtime = output(&files, "people/_proto_types.py");
    assert!(runtime.contains("def _validate_email"));
    assert!(runtime.contains("def _require_unique"));
    assert!(runtime.contains("def _require_finite"));
    assert!(!runtime.contains("ProtoInt64"));
    assert!(!runtime.contains("def _validate_uuid"));

    // The validation schema itself is never generated
    assert!(files.iter().all(|f| !f.name.starts_with("buf/")));
}

#[test]
fn test_untranslatable_ranges() {
    let proto = r#"
syntax = "proto3";
package ranges;
import "buf/validate/validate.proto";
import "google/protobuf/duration.proto";

message Window {
  int32 outside = 1 [(buf.validate.field).int32 = {gt: 10, lt: 5}];
  google.protobuf.Duration ttl = 2 [(buf.validate.field).duration = {gt: {seconds: 1}}];
  int64 version = 3 [(buf.validate.field).int64.const = 3];
  string tier = 4 [(buf.validate.field).string = {in: ["gold", "silver"]}];
}
"#;
    let files = generate(&[("ranges.proto", proto)], None);
    let module = output(&files, "ranges_pydantic.py");

    // An inverted range means "outside", which ge/le cannot express
    assert!(module.contains(
        "    outside: \"int\" = _Field(\n        0,\n        # buf.validate: gt (not translated)\n        # buf.validate: lt (not translated)\n    )\n"
    ));
    assert!(module.contains(
        "    ttl: \"ProtoDuration | None\" = _Field(\n        None,\n        # buf.validate: gt (not translated)\n    )\n"
    ));

    // 64-bit constants keep the string codec and compare at runtime
    assert!(module.contains(
        "    version: \"_Annotated[ProtoInt64, _AfterValidator(_make_const_validator(3))]\" = _Field(\n        3,\n    )\n"
    ));
    assert!(module.contains("\"_Annotated[str, _AfterValidator(_make_in_validator(frozenset({'gold', 'silver'})))]\""));

    let runtime = output(&files, "_proto_types.py");
    for symbol in ["ProtoInt64", "ProtoDuration", "_make_const_validator", "_make_in_validator"] {
        assert!(runtime.contains(symbol), "runtime module lacks {}", symbol);
    }
    assert_eq!(
        files.iter().filter(|f| f.name.ends_with("_proto_types.py")).count(),
        1
    );
}

#[test]
fn test_zero_defaults_respect_constraints() {
    let proto = r#"
syntax = "proto3";
package defaults;
import "buf/validate/validate.proto";

message Limits {
  int32 positive = 1 [(buf.validate.field).int32.gt = 0];
  int32 non_negative = 2 [(buf.validate.field).int32.gte = 0];
  int32 below = 3 [(buf.validate.field).int32.lt = 0];
  double ratio = 4 [(buf.validate.field).double = {gte: -1, lte: 1}];
  string slug = 5 [(buf.validate.field).string.pattern = "^[a-z]*$"];
  string tier = 6 [(buf.validate.field).string = {in: ["gold", "silver"]}];
  uint32 code = 7 [(buf.validate.field).uint32 = {not_in: [0]}];
  repeated string tags = 8 [(buf.validate.field).repeated.min_items = 1];
  map<string, int32> counts = 9 [(buf.validate.field).map.max_pairs = 3];
  optional int32 level = 10 [(buf.validate.field).int32.gt = 0];
}
"#;
    let files = generate(&[("defaults.proto", proto)], None);
    let module = output(&files, "defaults_pydantic.py");

    // Zero rejected: the field is required
    assert!(module.contains("    positive: \"int\" = _Field(\n        gt=0,\n    )\n"));
    assert!(module.contains("    below: \"int\" = _Field(\n        lt=0,\n    )\n"));
    assert!(module.contains("    tier: \"_Annotated[str, _AfterValidator(_make_in_validator(frozenset({'gold', 'silver'})))]\" = _Field()\n"));
    assert!(module.contains("    code: \"_Annotated[int, _AfterValidator(_make_not_in_validator(frozenset({0})))]\" = _Field()\n"));
    assert!(module.contains("    tags: \"list[str]\" = _Field(\n        min_length=1,\n    )\n"));

    // Zero accepted: the proto zero stays the default
    assert!(module.contains("    non_negative: \"int\" = _Field(\n        0,\n        ge=0,\n    )\n"));
    assert!(module.contains("    ratio: \"float\" = _Field(\n        0.0,\n        ge=-1.0,\n        le=1.0,\n    )\n"));
    assert!(module.contains("    slug: \"str\" = _Field(\n        \"\",\n        pattern=\"^[a-z]*$\",\n    )\n"));
    assert!(module.contains("    counts: \"dict[str, int]\" = _Field(\n        default_factory=dict,\n        max_length=3,\n    )\n"));

    // Nullable fields default to None regardless
    assert!(module.contains("    level: \"int | None\" = _Field(\n        None,\n        gt=0,\n    )\n"));
}
