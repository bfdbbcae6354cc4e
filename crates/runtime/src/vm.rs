//! The VM (C5 + C6 glue): program counter, label-resolved control flow, the dual call stacks,
//! and the three externally callable entry points (`execute`, `resume_with_input`,
//! `process_incoming_text`) that make up the Pause/Resume Scheduler (§4.5, §4.6).

use std::time::Instant;

use twx_compiler::{Accessor, Expr, Instr, Program, VarRef};
use twx_core::{GameState, Path, SectorRecord, SystemContext, Store, Value, resolve_constant};

use crate::commands;
use crate::config::VmConfig;
use crate::error::{FatalKind, VmError};
use crate::persistence::PersistenceStore;
use crate::sinks::{OutputSink, TransportSink};
use crate::triggers::{TriggerKind, TriggerTable};
use crate::wait::{Deadline, WaitState};

/// PC sentinel pushed onto the trigger call stack in place of a real return address: a trigger
/// handler's top-level `return` pops this and hands control back to the dispatcher rather than
/// to any instruction (§4.7 — the trigger stack is isolated from the foreground stack).
const TRIGGER_SENTINEL: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecMode {
    Foreground,
    Trigger,
}

pub struct Vm {
    program: Program,
    pc: usize,
    mode: ExecMode,
    /// Where the foreground script should resume once the in-flight trigger handler completes.
    suspended_foreground_pc: Option<usize>,

    store: Store,
    call_stack: Vec<usize>,
    trigger_call_stack: Vec<usize>,
    wait: WaitState,
    triggers: TriggerTable,
    config: VmConfig,

    game: Box<dyn GameState>,
    /// Structured records bound by `getSector n destVar`, keyed by the destination's canonical
    /// base name and read back through `destVar.field` dotted accessors (§4.9).
    sector_bindings: std::collections::HashMap<String, SectorRecord>,

    persistence: Box<dyn PersistenceStore>,
    output: Box<dyn OutputSink>,
    transport: Box<dyn TransportSink>,

    current_line: String,
    line_acc: String,
    rolling_buffer: String,

    /// `startTimer`/`stopTimer` bookkeeping, keyed by canonical timer name.
    timers: std::collections::HashMap<String, Instant>,
}

impl Vm {
    pub fn new(
        program: Program,
        game: Box<dyn GameState>,
        persistence: Box<dyn PersistenceStore>,
        output: Box<dyn OutputSink>,
        transport: Box<dyn TransportSink>,
        config: VmConfig,
    ) -> Self {
        Vm {
            program,
            pc: 0,
            mode: ExecMode::Foreground,
            suspended_foreground_pc: None,
            store: Store::new(),
            call_stack: Vec::new(),
            trigger_call_stack: Vec::new(),
            wait: WaitState::Running,
            triggers: TriggerTable::new(),
            config,
            game,
            sector_bindings: std::collections::HashMap::new(),
            persistence,
            output,
            transport,
            current_line: String::new(),
            line_acc: String::new(),
            rolling_buffer: String::new(),
            timers: std::collections::HashMap::new(),
        }
    }

    pub fn wait_state(&self) -> &WaitState {
        &self.wait
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ---- external entry points (§4.6) ----------------------------------------------------

    pub fn execute(&mut self) -> Result<(), VmError> {
        self.wake_on_due_delay();
        self.dispatch_due_delay_triggers().map_err(VmError::Fatal)?;
        self.run_until_suspended().map_err(|e| {
            tracing::info!(error = %e, "vm halted on fatal error");
            self.wait = WaitState::Halted;
            VmError::Fatal(e)
        })
    }

    pub fn resume_with_input(&mut self, text: &str) -> Result<(), VmError> {
        let (default, dest) = match &self.wait {
            WaitState::WaitingForInput { default, dest, .. } => (default.clone(), dest.clone()),
            _ => return Ok(()),
        };
        let value = if text.is_empty() { default } else { text.to_string() };
        self.set_var(&dest, Value::Str(value)).map_err(VmError::Fatal)?;
        self.wait = WaitState::Running;
        tracing::trace!("resumed from WaitingForInput");
        Ok(())
    }

    pub fn process_incoming_text(&mut self, chunk: &str) -> Result<(), VmError> {
        self.wake_on_due_delay();
        let completed_lines = self.feed_chunk(chunk);
        self.dispatch_triggers(&completed_lines).map_err(VmError::Fatal)?;

        if let WaitState::WaitingForText { pattern } = &self.wait {
            if self.rolling_buffer.contains(pattern.as_str()) {
                self.wait = WaitState::Running;
            }
        }
        Ok(())
    }

    /// Fire any registered `Event` trigger matching `name` (§4.7's event-kind trigger; not part
    /// of the text pipeline, used for collaborator-posted events).
    pub fn post_event(&mut self, name: &str) -> Result<(), VmError> {
        let ids = self.triggers.snapshot_ids();
        for id in ids {
            let Some(trigger) = self.triggers.get(id).cloned() else { continue };
            let TriggerKind::Event { name: event_name } = &trigger.kind else { continue };
            if event_name != name {
                continue;
            }
            let stop = self.run_trigger(&trigger.handler).map_err(VmError::Fatal)?;
            if stop {
                break;
            }
        }
        Ok(())
    }

    // ---- suspension helpers, called by command handlers ----------------------------------

    pub fn begin_wait_for_input(&mut self, prompt: String, default: String, dest: VarRef) {
        self.wait = WaitState::WaitingForInput { prompt, default, dest };
    }

    pub fn begin_wait_for_text(&mut self, pattern: String) {
        self.wait = WaitState::WaitingForText { pattern };
    }

    pub fn begin_pause(&mut self, millis: Option<u64>) {
        let deadline = match millis {
            Some(ms) => Deadline::At(Instant::now() + std::time::Duration::from_millis(ms)),
            None if self.config.pause_waits_forever => Deadline::Forever,
            None => Deadline::At(Instant::now()),
        };
        self.wait = WaitState::WaitingForDelay { deadline };
    }

    pub fn halt(&mut self) {
        self.wait = WaitState::Halted;
    }

    // ---- sinks / collaborators, exposed to command handlers ------------------------------

    pub fn output(&mut self, text: &str) {
        self.output.output(text);
    }

    pub fn send(&mut self, bytes: &str) {
        self.transport.send(bytes);
    }

    pub fn game(&self) -> &dyn GameState {
        self.game.as_ref()
    }

    pub fn bind_sector(&mut self, dest_base: &str, record: SectorRecord) {
        self.sector_bindings.insert(Path::canonicalize(dest_base), record);
    }

    pub fn persistence_save(&mut self, path: &Path) -> Result<(), FatalKind> {
        let value = self.store.get(path)?;
        self.persistence
            .put(&path.qualified_key(), value)
            .map_err(|e| FatalKind::TypeMismatch { command: "saveVar".into(), detail: e.to_string() })?;
        self.persistence
            .flush()
            .map_err(|e| FatalKind::TypeMismatch { command: "saveVar".into(), detail: e.to_string() })
    }

    pub fn persistence_load(&mut self, path: &Path) -> Result<(), FatalKind> {
        let loaded = self
            .persistence
            .get(&path.qualified_key())
            .map_err(|e| FatalKind::TypeMismatch { command: "loadVar".into(), detail: e.to_string() })?;
        if let Some(value) = loaded {
            self.store.set(path, value)?;
        }
        Ok(())
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerTable {
        &mut self.triggers
    }

    pub fn declare_array(&mut self, name: &str, size: usize) {
        self.store.declare_array(name, size);
    }

    /// Record the current instant under `name` for a later `stopTimer`.
    pub fn start_timer(&mut self, name: &str) {
        self.timers.insert(Path::canonicalize(name), Instant::now());
    }

    /// Elapsed seconds since the matching `startTimer`, or `0.0` if none was ever started.
    pub fn stop_timer(&mut self, name: &str) -> f64 {
        match self.timers.remove(&Path::canonicalize(name)) {
            Some(start) => start.elapsed().as_secs_f64(),
            None => 0.0,
        }
    }

    pub fn current_line(&self) -> &str {
        &self.current_line
    }

    // ---- variable access, shared by the evaluator and command handlers -------------------

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, FatalKind> {
        crate::eval::eval(expr, self)
    }

    /// Read a variable's current value through the same resolution order as `Expr::Var`
    /// (dotted accessors, then the store, then system constants) — used by the arithmetic and
    /// text families' "mutate the destination in place" handlers.
    pub fn read_var(&mut self, v: &VarRef) -> Result<Value, FatalKind> {
        crate::eval::VarLookup::lookup(self, v)
    }

    fn eval_subscripts(&mut self, subs: &[Expr]) -> Result<Vec<String>, FatalKind> {
        let mut out = Vec::with_capacity(subs.len());
        for e in subs {
            out.push(self.eval(e)?.to_subscript_string());
        }
        Ok(out)
    }

    pub fn resolve_write_path(&mut self, v: &VarRef) -> Result<Path, FatalKind> {
        let subs = self.eval_subscripts(&v.subscripts)?;
        Ok(Path::indexed(&v.base, subs))
    }

    pub fn set_var(&mut self, v: &VarRef, value: Value) -> Result<(), FatalKind> {
        let path = self.resolve_write_path(v)?;
        self.store.set(&path, value)?;
        Ok(())
    }

    fn resolve_accessors(&mut self, base: &str, accessors: &[Accessor]) -> Result<Value, FatalKind> {
        let record = self.sector_bindings.get(base).cloned().unwrap_or_default();
        match accessors {
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("index") => Ok(Value::Number(record.index as f64)),
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("density") => Ok(Value::Number(record.density as f64)),
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("explored") => Ok(Value::bool(record.explored)),
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("beacon") => Ok(Value::Str(record.beacon.clone())),
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("constellation") => {
                Ok(Value::Str(record.constellation.clone()))
            }
            [Accessor::Field(f)] if f.eq_ignore_ascii_case("warps") => Ok(Value::Str(
                record.warps.iter().map(i64::to_string).collect::<Vec<_>>().join(","),
            )),
            [Accessor::FieldIndex(f, idx_expr)] if f.eq_ignore_ascii_case("warp") => {
                let idx = self.eval(idx_expr)?.as_number() as i64;
                let value = if idx >= 1 && (idx as usize) <= record.warps.len() {
                    record.warps[(idx - 1) as usize]
                } else {
                    0
                };
                Ok(Value::Number(value as f64))
            }
            [Accessor::Field(f1), Accessor::Field(f2)] if f1.eq_ignore_ascii_case("port") => {
                match f2.to_lowercase().as_str() {
                    "exists" => Ok(Value::bool(record.port.as_ref().is_some_and(|p| p.exists))),
                    "class" => Ok(Value::Number(record.port.as_ref().map_or(0, |p| p.class) as f64)),
                    "name" => Ok(Value::Str(record.port.as_ref().map_or(String::new(), |p| p.name.clone()))),
                    _ => Ok(Value::empty()),
                }
            }
            _ => Ok(Value::empty()),
        }
    }

    // ---- step loop ------------------------------------------------------------------------

    fn active_stack_mut(&mut self) -> &mut Vec<usize> {
        match self.mode {
            ExecMode::Foreground => &mut self.call_stack,
            ExecMode::Trigger => &mut self.trigger_call_stack,
        }
    }

    fn active_stack_depth_limit(&self) -> usize {
        match self.mode {
            ExecMode::Foreground => self.config.max_call_stack_depth,
            ExecMode::Trigger => self.config.max_trigger_stack_depth,
        }
    }

    fn label_index(&self, label: &str) -> Result<usize, FatalKind> {
        self.program
            .label_index(label)
            .ok_or_else(|| FatalKind::UnknownLabel { label: label.to_string() })
    }

    fn step(&mut self) -> Result<(), FatalKind> {
        let instr = self.program.instrs[self.pc].clone();
        self.pc += 1;
        match instr {
            Instr::Label(_) => {}
            Instr::Call { command, args, line } => commands::dispatch(self, &command, &args, line)?,
            Instr::Assign { target, expr, .. } => {
                let value = self.eval(&expr)?;
                self.set_var(&target, value)?;
            }
            Instr::Branch { cond, then_label, else_label, .. } => {
                let cond = self.eval(&cond)?;
                let target = if cond.truthy() { then_label } else { else_label };
                self.pc = self.label_index(&target)?;
            }
            Instr::Jump(label) => {
                self.pc = self.label_index(&label)?;
            }
            Instr::Gosub(label) => {
                let limit = self.active_stack_depth_limit();
                let return_pc = self.pc;
                let stack = self.active_stack_mut();
                if stack.len() >= limit {
                    return Err(FatalKind::CallStackOverflow { depth: stack.len() });
                }
                stack.push(return_pc);
                self.pc = self.label_index(&label)?;
            }
            Instr::Return => {
                let stack = self.active_stack_mut();
                match stack.pop() {
                    Some(pc) => self.pc = pc,
                    None => return Err(FatalKind::ReturnWithEmptyStack),
                }
            }
            Instr::Halt => self.wait = WaitState::Halted,
        }
        Ok(())
    }

    /// Keep stepping, transparently crossing back from a completed trigger handler into
    /// foreground code, until the wait state stops being `Running`.
    fn run_until_suspended(&mut self) -> Result<(), FatalKind> {
        loop {
            if !self.wait.is_running() {
                return Ok(());
            }
            if self.mode == ExecMode::Trigger && self.pc == TRIGGER_SENTINEL {
                self.mode = ExecMode::Foreground;
                if let Some(pc) = self.suspended_foreground_pc.take() {
                    self.pc = pc;
                }
                continue;
            }
            if self.pc >= self.program.instrs.len() {
                self.wait = WaitState::Halted;
                return Ok(());
            }
            self.step()?;
        }
    }

    // ---- trigger dispatch (C7) -------------------------------------------------------------

    fn wake_on_due_delay(&mut self) {
        if let WaitState::WaitingForDelay { deadline } = &self.wait {
            if deadline.is_due(Instant::now()) {
                self.wait = WaitState::Running;
            }
        }
    }

    /// Run one trigger handler to completion or to its own suspend point. Returns `true` when
    /// the VM is left in a non-`Running` state the caller should stop dispatching further
    /// triggers for (halted, or the handler itself suspended the VM) — `false` when the handler
    /// returned cleanly and the original wait state (if any) was restored undisturbed.
    fn run_trigger(&mut self, label: &str) -> Result<bool, FatalKind> {
        let saved_wait = std::mem::replace(&mut self.wait, WaitState::Running);
        self.suspended_foreground_pc = Some(self.pc);
        self.mode = ExecMode::Trigger;
        self.trigger_call_stack.push(TRIGGER_SENTINEL);
        self.pc = self.label_index(label)?;

        loop {
            if self.wait.is_halted() {
                return Ok(true);
            }
            if self.pc == TRIGGER_SENTINEL {
                self.mode = ExecMode::Foreground;
                if let Some(pc) = self.suspended_foreground_pc.take() {
                    self.pc = pc;
                }
                // A bare `pause` waits on "any trigger firing" (Deadline::Forever) — the
                // trigger that just ran to completion is that wake stimulus, so the foreground
                // script resumes running rather than sitting back down in the same wait.
                self.wait = match saved_wait {
                    WaitState::WaitingForDelay { deadline: Deadline::Forever } => WaitState::Running,
                    other => other,
                };
                return Ok(false);
            }
            if !self.wait.is_running() {
                return Ok(true);
            }
            self.step()?;
        }
    }

    /// Fire any `Delay`-kind trigger whose deadline has passed. Split out from `dispatch_triggers`
    /// so a bare `Execute()` (no incoming text) can sweep due delay triggers without re-testing
    /// `TextMatch`/`TextLine` patterns against a rolling buffer that hasn't changed (§4.7, §4.6).
    fn dispatch_due_delay_triggers(&mut self) -> Result<(), FatalKind> {
        let ids = self.triggers.snapshot_ids();
        for id in ids {
            let Some(trigger) = self.triggers.get(id).cloned() else { continue };
            let TriggerKind::Delay { deadline } = &trigger.kind else { continue };
            if Instant::now() < *deadline {
                continue;
            }
            self.triggers.kill(id);
            tracing::debug!(trigger_id = id, handler = %trigger.handler, "trigger fired");
            let stop = self.run_trigger(&trigger.handler)?;
            if stop {
                break;
            }
        }
        Ok(())
    }

    fn dispatch_triggers(&mut self, completed_lines: &[String]) -> Result<(), FatalKind> {
        let ids = self.triggers.snapshot_ids();
        for id in ids {
            let Some(trigger) = self.triggers.get(id).cloned() else { continue };
            let should_fire = match &trigger.kind {
                TriggerKind::TextMatch { pattern } => self.rolling_buffer.contains(pattern.as_str()),
                TriggerKind::TextLine { pattern } => completed_lines.iter().any(|l| l.contains(pattern.as_str())),
                TriggerKind::Delay { deadline } => Instant::now() >= *deadline,
                TriggerKind::Event { .. } => false,
            };
            if !should_fire {
                continue;
            }
            if matches!(trigger.kind, TriggerKind::Delay { .. }) {
                self.triggers.kill(id);
            }
            tracing::debug!(trigger_id = id, handler = %trigger.handler, "trigger fired");
            let stop = self.run_trigger(&trigger.handler)?;
            if stop {
                break;
            }
        }
        Ok(())
    }

    /// Append `chunk` to the rolling match buffer and the in-progress line accumulator,
    /// returning any lines completed by this chunk and updating `CURRENTLINE` (§4.9).
    fn feed_chunk(&mut self, chunk: &str) -> Vec<String> {
        const ROLLING_CAP: usize = 1024;
        self.rolling_buffer.push_str(chunk);
        if self.rolling_buffer.len() > ROLLING_CAP {
            let excess = self.rolling_buffer.len() - ROLLING_CAP;
            self.rolling_buffer.drain(..excess);
        }

        self.line_acc.push_str(chunk);
        let mut completed = Vec::new();
        while let Some(idx) = self.line_acc.find('\n') {
            let mut line: String = self.line_acc.drain(..=idx).collect();
            line.pop(); // trailing '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            completed.push(line);
        }

        self.current_line = if self.line_acc.is_empty() {
            completed.last().cloned().unwrap_or_default()
        } else {
            self.line_acc.clone()
        };
        completed
    }

    fn system_context(&self) -> SystemContext<'_> {
        let current_sector = self.game.current_sector();
        let current_port = self
            .game
            .get_sector(current_sector)
            .port
            .map(|p| p.class)
            .unwrap_or(0);
        SystemContext::new(&self.current_line, current_sector, current_port)
    }
}

impl crate::eval::VarLookup for Vm {
    fn lookup(&mut self, v: &VarRef) -> Result<Value, FatalKind> {
        if !v.accessors.is_empty() {
            let base = Path::canonicalize(&v.base);
            return self.resolve_accessors(&base, &v.accessors);
        }

        let subs = self.eval_subscripts(&v.subscripts)?;
        let path = Path::indexed(&v.base, subs);
        if self.store.has(&path) {
            return Ok(self.store.get(&path)?);
        }
        if v.subscripts.is_empty() {
            let ctx = self.system_context();
            if let Some(value) = resolve_constant(&v.base.to_uppercase(), &ctx) {
                return Ok(value);
            }
        }
        Ok(self.store.get(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sinks::BufferSink;
    use std::sync::{Arc, Mutex};
    use twx_core::StaticGameState;

    /// `BufferSink` split into two trait objects that share one backing `Vec`/`VecDeque` via a
    /// mutex, so tests can inspect output after constructing the VM with owned `Box<dyn _>`s.
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
    fn nested_gosub_accumulator() {
        let (mut vm, sink) = build_vm(
            "\
setVar depth 0
gosub LEVEL1
halt
:LEVEL1
add depth 1
echo \"Depth = \" depth
gosub LEVEL2
echo \"Back in LEVEL1, depth = \" depth
return
:LEVEL2
add depth 1
echo \"Depth = \" depth
gosub LEVEL3
echo \"Back in LEVEL2, depth = \" depth
return
:LEVEL3
add depth 1
echo \"Depth = \" depth
return
",
        );
        vm.execute().unwrap();
        assert!(vm.wait_state().is_halted());
        assert_eq!(vm.store.get(&Path::scalar("depth")).unwrap(), Value::Number(3.0));
        let out = sink.lock().unwrap().drain_output();
        assert_eq!(
            out,
            vec![
                "Depth = 1",
                "Depth = 2",
                "Depth = 3",
                "Back in LEVEL2, depth = 3",
                "Back in LEVEL1, depth = 3",
            ]
        );
    }

    #[test]
    fn getinput_suspends_and_resumes() {
        let (mut vm, sink) = build_vm(
            "\
getInput sector \"Sector\" \"\"
echo \"Sector: \" sector
",
        );
        vm.execute().unwrap();
        assert!(matches!(vm.wait_state(), WaitState::WaitingForInput { .. }));
        vm.resume_with_input("2157").unwrap();
        vm.execute().unwrap();
        assert!(vm.wait_state().is_halted());
        assert_eq!(sink.lock().unwrap().drain_output(), vec!["Sector: 2157"]);
    }

    #[test]
    fn return_with_empty_stack_is_fatal() {
        let (mut vm, _sink) = build_vm("return\n");
        let err = vm.execute().unwrap_err();
        assert_eq!(err, VmError::Fatal(FatalKind::ReturnWithEmptyStack));
    }

    #[test]
    fn trigger_handler_does_not_touch_foreground_stack() {
        let (mut vm, sink) = build_vm(
            "\
setTextTrigger 1 ONENEMY \"orc\"
gosub FOREGROUND
halt
:FOREGROUND
echo \"in foreground sub\"
return
:ONENEMY
echo \"Enemy found\"
return
",
        );
        vm.execute().unwrap();
        assert!(vm.wait_state().is_halted());
        vm.process_incoming_text("A fierce orc blocks your path\n").unwrap();
        let out = sink.lock().unwrap().drain_output();
        assert_eq!(out, vec!["in foreground sub", "Enemy found"]);
    }

    #[test]
    fn trigger_firing_during_bare_pause_wakes_foreground() {
        let (mut vm, sink) = build_vm(
            "\
setTextTrigger 1 ONENEMY \"orc\"
pause
echo \"resumed\"
halt
:ONENEMY
echo \"Enemy found\"
return
",
        );
        vm.execute().unwrap();
        assert!(matches!(
            vm.wait_state(),
            WaitState::WaitingForDelay { deadline: Deadline::Forever }
        ));

        vm.process_incoming_text("A fierce orc blocks your path\n").unwrap();
        assert!(vm.wait_state().is_running());

        vm.execute().unwrap();
        assert!(vm.wait_state().is_halted());
        assert_eq!(sink.lock().unwrap().drain_output(), vec!["Enemy found", "resumed"]);
    }
}
