//! End-to-end scenarios driving whole scripts through `Execute`/`ResumeWithInput`/
//! `ProcessIncomingText`, the concrete cases called out for the test suite.

use std::sync::{Arc, Mutex};

use twx_core::StaticGameState;
use twx_runtime::{BufferSink, MemoryStore, OutputSink, TransportSink, Vm, VmConfig, WaitState};

struct SharedOutput(Arc<Mutex<BufferSink>>);
impl OutputSink for SharedOutput {
    fn output(&mut self, text: &str) {
        self.0.lock().unwrap().output(text);
    }
}

struct SharedTransport(Arc<Mutex<BufferSink>>);
impl TransportSink for SharedTransport {
    fn send(&mut self, bytes: &str) {
        self.0.lock().unwrap().send(bytes);
    }
}

fn build_vm(source: &str) -> (Vm, Arc<Mutex<BufferSink>>) {
    let program = twx_compiler::compile(source).expect("script compiles");
    let sink = Arc::new(Mutex::new(BufferSink::new()));
    let vm = Vm::new(
        program,
        Box::new(StaticGameState::new(0)),
        Box::new(MemoryStore::new()),
        Box::new(SharedOutput(sink.clone())),
        Box::new(SharedTransport(sink.clone())),
        VmConfig::default(),
    );
    (vm, sink)
}

#[test]
fn text_processing_parity() {
    let (mut vm, sink) = build_vm(
        "\
setVar src \"Sector 123 Density: 45 Warps: 3\"
getWord src w1 2
getWord src w2 4
getWord src w3 6
echo w1 \" \" w2 \" \" w3
",
    );
    vm.execute().unwrap();
    assert!(vm.wait_state().is_halted());
    assert_eq!(sink.lock().unwrap().drain_output(), vec!["123 45 3"]);
}

#[test]
fn pascal_style_arithmetic() {
    let (mut vm, sink) = build_vm(
        "\
setVar counter 10
add counter 5
echo counter
multiply counter 2
echo counter
divide counter 4
echo counter
",
    );
    vm.execute().unwrap();
    assert!(vm.wait_state().is_halted());
    assert_eq!(sink.lock().unwrap().drain_output(), vec!["15", "30", "8"]);
}

#[test]
fn multiple_getinput_pause_resume() {
    let (mut vm, sink) = build_vm(
        "\
getInput sector \"Enter sector\"
getInput times \"Enter times\"
getInput note \"Enter note\"
echo \"Sector: \" sector
echo \"Times: \" times
",
    );
    vm.execute().unwrap();
    assert!(matches!(vm.wait_state(), WaitState::WaitingForInput { prompt, .. } if prompt == "Enter sector"));

    vm.resume_with_input("2157").unwrap();
    vm.execute().unwrap();
    assert!(matches!(vm.wait_state(), WaitState::WaitingForInput { prompt, .. } if prompt == "Enter times"));

    vm.resume_with_input("3").unwrap();
    vm.execute().unwrap();
    assert!(matches!(vm.wait_state(), WaitState::WaitingForInput { prompt, .. } if prompt == "Enter note"));

    vm.resume_with_input("none").unwrap();
    vm.execute().unwrap();
    assert!(vm.wait_state().is_halted());

    let out = sink.lock().unwrap().drain_output();
    assert_eq!(out, vec!["Sector: 2157", "Times: 3"]);
}

#[test]
fn cross_instance_persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    {
        let program = twx_compiler::compile(
            "\
setVar counter 0
gosub SUB
saveVar counter
halt
:SUB
add counter 5
return
",
        )
        .unwrap();
        let mut vm = Vm::new(
            program,
            Box::new(StaticGameState::new(0)),
            Box::new(twx_runtime::SledStore::open(dir.path()).unwrap()),
            Box::new(BufferSink::new()),
            Box::new(BufferSink::new()),
            VmConfig::default(),
        );
        vm.execute().unwrap();
        assert!(vm.wait_state().is_halted());
    }

    let (mut vm, sink) = {
        let program = twx_compiler::compile(
            "\
loadVar counter
echo \"Loaded counter: \" counter
gosub SUB
echo \"Counter in subroutine: \" counter
halt
:SUB
add counter 3
return
",
        )
        .unwrap();
        let sink = Arc::new(Mutex::new(BufferSink::new()));
        let vm = Vm::new(
            program,
            Box::new(StaticGameState::new(0)),
            Box::new(twx_runtime::SledStore::open(dir.path()).unwrap()),
            Box::new(SharedOutput(sink.clone())),
            Box::new(SharedTransport(sink.clone())),
            VmConfig::default(),
        );
        (vm, sink)
    };
    vm.execute().unwrap();
    assert!(vm.wait_state().is_halted());

    let out = sink.lock().unwrap().drain_output();
    assert_eq!(out, vec!["Loaded counter: 5", "Counter in subroutine: 8"]);
}

#[test]
fn trigger_pattern_match_on_substring() {
    let (mut vm, sink) = build_vm(
        "\
setTextTrigger 1 ONENEMY \"orc\"
halt
:ONENEMY
echo \"Enemy found\"
return
",
    );
    vm.execute().unwrap();
    assert!(vm.wait_state().is_halted());

    vm.process_incoming_text("A fierce orc blocks your path\n").unwrap();
    assert_eq!(sink.lock().unwrap().drain_output(), vec!["Enemy found"]);

    vm.process_incoming_text("A peaceful goblin walks by\n").unwrap();
    assert!(sink.lock().unwrap().drain_output().is_empty());
}
