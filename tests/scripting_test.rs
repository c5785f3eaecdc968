//! Integration tests for script execution against a session

use memscan::config::Config;
use memscan::memory::regions::ProtectionFlags;
use memscan::scripting::{
    ScriptApi, ScriptHost, ScriptInterpreter, ScriptValue, HELP_TEXT, SUCCESS_MESSAGE,
};
use memscan::{
    Address, Controller, DataType, MemoryError, MemoryResult, ProcessInfo, SimulatedProcess,
    Value,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn target() -> Arc<SimulatedProcess> {
    let mut bytes = vec![0u8; 128];
    for offset in [0usize, 32, 64] {
        bytes[offset..offset + 4].copy_from_slice(&500i32.to_ne_bytes());
    }
    Arc::new(SimulatedProcess::new(50).with_region(
        0xA000,
        bytes,
        ProtectionFlags::PAGE_READWRITE,
    ))
}

fn attached(process: &Arc<SimulatedProcess>) -> Controller {
    let mut config = Config::default();
    config.scanner.parallel = false;
    let mut controller = Controller::new(config);
    controller
        .attach_capability(process.clone(), ProcessInfo::new(50, "game"))
        .unwrap();
    controller
}

/// Prints, then fails or panics on request
struct Scripted;

impl ScriptInterpreter for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn execute(&self, code: &str, api: &mut ScriptApi) -> MemoryResult<Option<ScriptValue>> {
        api.print(format!("running {}", code));
        match code {
            "fail" => Err(MemoryError::Script("told to fail".into())),
            "panic" => panic!("told to panic"),
            _ => Ok(api
                .read_typed(Address::new(0xA000), DataType::Int32)?
                .map(ScriptValue::Value)),
        }
    }
}

#[test]
fn test_detached_script_without_memory_access_succeeds() {
    let host = ScriptHost::default();
    let mut api = ScriptApi::default();

    let outcome = host.run("let x = 2", &mut api);
    assert!(outcome.success);
    assert_eq!(outcome.output, SUCCESS_MESSAGE);
    assert_eq!(outcome.return_value, None);

    let outcome = host.run("help()", &mut api);
    assert!(outcome.success);
    assert_eq!(outcome.output, HELP_TEXT);
}

#[tokio::test]
async fn test_oversized_script_reads_fail_without_allocating() {
    let process = target();
    let mut controller = attached(&process);

    for code in [
        "return readBytes(0xA000, 0x7FFFFFFFFFFF)",
        "return readString(0xA000, 0x7FFFFFFFFFFF)",
    ] {
        let outcome = controller.run_script(code);
        assert!(!outcome.success, "{code}");
        assert!(outcome.error.unwrap().contains("byte limit"), "{code}");
    }

    let outcome = controller.run_script("return readBytes(0xA000, 4)");
    assert!(outcome.success);
    assert_eq!(
        outcome.return_value,
        Some(ScriptValue::Bytes(500i32.to_ne_bytes().to_vec()))
    );

    assert!(matches!(
        controller.read_bytes(Address::new(0xA000), usize::MAX),
        Err(MemoryError::ReadTooLarge { .. })
    ));
}

#[test]
fn test_detached_memory_access_fails_cleanly() {
    let host = ScriptHost::default();
    let mut api = ScriptApi::default();

    let outcome = host.run("print(\"before\")\nreadInt(0xA000)", &mut api);
    assert!(!outcome.success);
    assert_eq!(outcome.output, "before");
    assert!(outcome.error.unwrap().contains("No process attached"));
}

#[tokio::test]
async fn test_failures_are_contained_per_run() {
    let process = target();
    let mut controller = attached(&process).with_interpreter(Scripted);

    let outcome = controller.run_script("fail");
    assert!(!outcome.success);
    assert_eq!(outcome.output, "running fail");
    assert_eq!(outcome.error.as_deref(), Some("Script error: told to fail"));

    let outcome = controller.run_script("panic");
    assert!(!outcome.success);
    assert_eq!(outcome.output, "running panic");
    assert_eq!(outcome.error.as_deref(), Some("panic: told to panic"));

    let outcome = controller.run_script("read");
    assert!(outcome.success);
    assert_eq!(outcome.output, "running read");
    assert_eq!(outcome.return_value, Some(ScriptValue::Value(Value::Int(500))));

    // the session is still usable after a panicking script
    let found = controller
        .scan(Value::Int(500), DataType::Int32, None)
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn test_script_scan_is_visible_to_the_controller() {
    let process = target();
    let mut controller = attached(&process);

    let outcome = controller.run_script(
        "scan(500, Int32)\n\
         writeInt(0xA020, 501)\n\
         return count(filterUnchanged(Int32))",
    );
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.return_value, Some(ScriptValue::Value(Value::UInt(2))));

    let addresses: Vec<Address> = controller.results().iter().map(|r| r.address()).collect();
    assert_eq!(addresses, vec![Address::new(0xA000), Address::new(0xA040)]);
    assert_eq!(controller.stats().results, 2);
}

#[tokio::test]
async fn test_saved_scripts_run_in_order_and_survive_failures() {
    let process = target();
    let mut controller = attached(&process);

    controller.save_script("first", "writeInt(0xA000, 1)", true);
    controller.save_script("second", "writeInt(0xA000, \"x\")", true);
    controller.save_script("third", "print(readInt(0xA000))", true);
    controller.save_script("first", "writeInt(0xA000, 2)", true);

    let outcomes = controller.run_auto_scripts();
    let names: Vec<&str> = outcomes.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert!(outcomes[0].1.success);
    assert!(!outcomes[1].1.success);
    assert_eq!(outcomes[2].1.output, "2");

    let enabled: Vec<bool> = controller.scripts().iter().map(|s| s.enabled).collect();
    assert_eq!(enabled, vec![true, false, true]);
}

#[tokio::test]
async fn test_detach_turns_script_memory_calls_into_errors() {
    let process = target();
    let mut controller = attached(&process);
    assert!(controller.run_script("readInt(0xA000)").success);

    controller.detach();
    let outcome = controller.run_script("readInt(0xA000)");
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("No process attached"));
}
