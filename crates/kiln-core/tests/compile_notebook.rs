//! Integration tests for whole-notebook compilation.
//!
//! Exercises the full pipeline: cell records → classification →
//! generation → assembly.

use kiln_core::compile::{FieldSpec, split_top_level};
use kiln_core::{CellKind, CellRecord, CompileContext, PREAMBLE, Severity, compile_notebook};

// =============================================================================
// Test Helpers
// =============================================================================

fn compile(cells: &[CellRecord]) -> kiln_core::CompiledUnit {
    compile_notebook(cells, &mut CompileContext::new())
}

/// A notebook mixing every cell kind, with HTTP cells interleaved.
fn mixed_notebook() -> Vec<CellRecord> {
    vec![
        CellRecord::code("import time\nUSERS = {}"),
        CellRecord::code(
            "# @HTTP GET /users/{id}\n# query: name:str\ndef get_user(id, name):\n    return USERS.get(id)",
        ),
        CellRecord {
            kind: CellKind::Markdown,
            source: "# Users\nSome prose.".into(),
        },
        CellRecord::code("# @SCHEDULE\n# interval: 5m\nprint('tick')"),
        CellRecord::code(
            "# @HTTP POST /users\n# body: name:str, age:int?\nasync def create_user(name, age):\n    return {'name': name}",
        ),
        CellRecord::code("# @WS /ws/echo\nasync def echo(data):\n    return data"),
        CellRecord::code("# @SCHEDULE\n# cron: 0 0 12 * * *\nprint('noon')"),
    ]
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in:\n{haystack}"))
}

// =============================================================================
// Assembly
// =============================================================================

#[test]
fn test_unit_starts_with_preamble() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.starts_with(PREAMBLE));
    assert!(PREAMBLE.ends_with("from websocket_manager import manager\n\n\nrouter = APIRouter()\n"));
}

#[test]
fn test_non_http_cells_precede_http_cells() {
    let unit = compile(&mixed_notebook());
    let src = &unit.source;

    let passthrough = position(src, "USERS = {}");
    let interval_job = position(src, "async def scheduled_generated_func_0():");
    let websocket = position(src, "async def echo_websocket(");
    let cron_job = position(src, "async def scheduled_generated_func_1():");
    let get_route = position(src, "@router.get('/users/{id}')");
    let post_route = position(src, "@router.post('/users')");

    assert!(passthrough < interval_job);
    assert!(interval_job < websocket);
    assert!(websocket < cron_job);
    assert!(cron_job < get_route);
    assert!(get_route < post_route);
    assert_eq!(unit.compiled, 6);
    assert_eq!(unit.skipped, 0);
}

#[test]
fn test_compilation_is_deterministic() {
    let cells = mixed_notebook();
    let first = compile(&cells);
    let second = compile(&cells);
    assert_eq!(first.source, second.source);
}

#[test]
fn test_reset_context_reproduces_names() {
    let cells = mixed_notebook();
    let mut ctx = CompileContext::new();

    let first = compile_notebook(&cells, &mut ctx);
    let continued = compile_notebook(&cells, &mut ctx);
    assert_ne!(first.source, continued.source);
    assert!(continued.source.contains("scheduled_generated_func_2"));

    ctx.reset();
    let again = compile_notebook(&cells, &mut ctx);
    assert_eq!(first.source, again.source);
}

// =============================================================================
// Generated content
// =============================================================================

#[test]
fn test_path_params_and_query_in_signature() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.contains("async def get_user_endpoint(id: str, name: str):"));
}

#[test]
fn test_interval_in_seconds() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.contains("name='generated_func_0_interval_job', seconds=300)"));
}

#[test]
fn test_cron_fields_positional() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.contains(
        "second='0', minute='0', hour='12', day='*', month='*', day_of_week='*')"
    ));
}

#[test]
fn test_optional_body_field_model() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.contains(
        "class CreateUserRequestBody(BaseModel):\n    name: str\n    age: Optional[int] = None\n"
    ));
    assert!(unit.source.contains("return await create_user(name=body.name, age=body.age)"));
}

#[test]
fn test_passthrough_is_verbatim() {
    let unit = compile(&mixed_notebook());
    assert!(unit.source.contains("\nimport time\nUSERS = {}\n"));
}

// =============================================================================
// Failure isolation
// =============================================================================

#[test]
fn test_bad_cell_does_not_fail_notebook() {
    let cells = vec![
        CellRecord::code("# @HTTP GET /broken\n# query: name: str\ndef broken(name):\n    pass"),
        CellRecord::code("# @HTTP GET /fine\ndef fine():\n    return 1"),
        CellRecord::code("# @SCHEDULE\n# cron: 0 12 * *\nprint('x')"),
    ];
    let unit = compile(&cells);

    assert_eq!(unit.skipped, 1);
    assert!(unit.source.contains("@router.get('/fine')"));
    assert!(!unit.source.contains("/broken"));
    assert!(unit.source.contains("# Invalid cron format"));

    let errors: Vec<_> = unit
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cell, 0);
    assert!(unit.diagnostics.iter().any(|d| d.cell == 2 && d.severity == Severity::Warning));
}

#[test]
fn test_missing_argument_warning_names_fields() {
    let cells = vec![CellRecord::code(
        "# @HTTP POST /items/{id}\n# body: title:str\n# headers: x_token:str\ndef add(id):\n    pass",
    )];
    let unit = compile(&cells);
    let warning = unit
        .diagnostics
        .iter()
        .find(|d| d.message.starts_with("missing expected arguments"))
        .expect("missing-argument warning");
    assert_eq!(warning.message, "missing expected arguments in function add: title, x_token");
}

#[test]
fn test_diagnostics_serialize() {
    let cells = vec![CellRecord::code("# @WS /ws\nx = 1")];
    let unit = compile(&cells);
    let json = serde_json::to_value(&unit.diagnostics).unwrap();
    assert_eq!(json[0]["severity"], "error");
    assert_eq!(json[0]["cell"], 0);
}

// =============================================================================
// Field specs
// =============================================================================

#[test]
fn test_split_top_level_property() {
    let cases = [
        ("a: list[int, str], b: dict[str, int]", vec!["a: list[int, str]", "b: dict[str, int]"]),
        ("x: {a, b}, y: int", vec!["x: {a, b}", "y: int"]),
        ("single", vec!["single"]),
        ("p: Dict[str, List[Tuple[int, int]]]", vec!["p: Dict[str, List[Tuple[int, int]]]"]),
    ];
    for (input, expected) in cases {
        assert_eq!(split_top_level(input), expected, "input: {input}");
    }
}

#[test]
fn test_field_markers() {
    let mut diags = kiln_core::compile::Diagnostics::for_cell(0);
    let optional = FieldSpec::parse("age: int?", &mut diags).unwrap();
    assert_eq!((optional.name.as_str(), optional.ty.as_str(), optional.optional), ("age", "int", true));

    let required = FieldSpec::parse("age: int!", &mut diags).unwrap();
    assert_eq!((required.ty.as_str(), required.optional), ("int", false));
}
