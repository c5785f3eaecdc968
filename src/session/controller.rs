//! Front-end facing controller over one optional attached process

use super::observer::SessionObserver;
use super::stats::SessionStats;
use crate::config::Config;
use crate::core::types::{
    Address, DataType, MemoryError, MemoryResult, ProcessId, ProcessInfo, ScanResult, SharedResult,
    Value,
};
use crate::memory::regions::{self, enumerate};
use crate::memory::{
    FilterKind, FreezeHandle, FreezeScheduler, MemoryPort, MemoryRegion, MemoryScanner,
    TrackedEntry, TrackedList,
};
use crate::process::{self, Capability};
use crate::scripting::{ScriptApi, ScriptHost, ScriptInterpreter, ScriptOutcome};
use crate::table::{CheatTable, SavedScript};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Progress callback handed to a background scan
pub type ScanProgress = Arc<dyn Fn(f64) + Send + Sync>;

/// Everything bound to one attached process
pub struct Session {
    info: ProcessInfo,
    port: MemoryPort,
    scanner: Arc<MemoryScanner>,
    regions: Vec<MemoryRegion>,
    freeze: FreezeHandle,
}

impl Session {
    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    pub fn port(&self) -> &MemoryPort {
        &self.port
    }

    pub fn scanner(&self) -> &Arc<MemoryScanner> {
        &self.scanner
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }
}

/// Owns the tracked list, saved scripts and at most one attached session.
///
/// Tracked entries outlive sessions: after re-attaching, the freeze
/// scheduler re-resolves them against the new process.
pub struct Controller {
    config: Config,
    tracked: TrackedList,
    scripts: Vec<SavedScript>,
    host: ScriptHost,
    api: ScriptApi,
    observers: Vec<Arc<dyn SessionObserver>>,
    session: Option<Session>,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        let api = ScriptApi::detached(config.memory.string_read_length)
            .with_max_read_size(config.memory.max_read_size);
        Controller {
            config,
            tracked: TrackedList::new(),
            scripts: Vec::new(),
            host: ScriptHost::default(),
            api,
            observers: Vec::new(),
            session: None,
        }
    }

    /// Replaces the built-in interpreter
    pub fn with_interpreter(mut self, interpreter: impl ScriptInterpreter + 'static) -> Self {
        self.host = ScriptHost::new(interpreter);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, event: impl Fn(&dyn SessionObserver)) {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tracked(&self) -> &TrackedList {
        &self.tracked
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    fn attached(&self) -> MemoryResult<&Session> {
        self.session.as_ref().ok_or(MemoryError::NotAttached)
    }

    // ---- attach / detach ----------------------------------------------

    /// Opens `pid` and attaches to it
    pub fn attach(&mut self, pid: ProcessId) -> MemoryResult<()> {
        let capability = process::open(pid)?;
        self.attach_capability(capability, ProcessInfo::unnamed(pid))
    }

    /// Attaches to an already opened capability.
    ///
    /// Any previous session is closed first. Needs a tokio runtime for the
    /// freeze scheduler; without one nothing is attached.
    pub fn attach_capability(&mut self, capability: Capability, info: ProcessInfo) -> MemoryResult<()> {
        self.detach();

        let port = MemoryPort::new(capability.clone())
            .with_string_length(self.config.memory.string_read_length);
        let regions = enumerate(capability.as_ref(), self.config.memory.address_ceiling);
        let scanner = Arc::new(MemoryScanner::new(port.clone(), self.config.scan_options()));
        let freeze = FreezeScheduler::new(
            port.clone(),
            self.tracked.clone(),
            self.config.freeze_interval(),
        )
        .spawn()?;

        info!(
            pid = info.pid,
            name = %info.name,
            regions = regions.len(),
            bytes = regions::total_size(&regions),
            "attached"
        );

        self.api = ScriptApi::attached(
            port.clone(),
            scanner.clone(),
            regions.clone(),
            self.config.memory.string_read_length,
        )
        .with_max_read_size(self.config.memory.max_read_size);
        self.session = Some(Session {
            info,
            port,
            scanner,
            regions,
            freeze,
        });
        self.notify(|o| o.results_replaced(0));
        Ok(())
    }

    /// Stops freezing, drops the capability and clears the working set
    pub fn detach(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.freeze.stop();
            session.scanner.clear_results();
            info!(pid = session.info.pid, "detached");
            self.notify(|o| o.results_replaced(0));
        }
        self.api = ScriptApi::detached(self.config.memory.string_read_length)
            .with_max_read_size(self.config.memory.max_read_size);
    }

    /// Walks the address space again, returning the qualifying region count
    pub fn enumerate_regions(&mut self) -> MemoryResult<usize> {
        let ceiling = self.config.memory.address_ceiling;
        let session = self.session.as_mut().ok_or(MemoryError::NotAttached)?;
        session.regions = enumerate(session.port.capability().as_ref(), ceiling);
        self.api.set_regions(session.regions.clone());
        info!(regions = session.regions.len(), "regions refreshed");
        Ok(session.regions.len())
    }

    /// Regions of the attached process; empty when detached
    pub fn regions(&self) -> &[MemoryRegion] {
        match &self.session {
            Some(session) => &session.regions,
            None => &[],
        }
    }

    // ---- scanning -----------------------------------------------------

    /// Runs an exact scan on the blocking pool
    pub async fn scan(
        &self,
        value: Value,
        data_type: DataType,
        progress: Option<ScanProgress>,
    ) -> MemoryResult<Vec<SharedResult>> {
        let session = self.attached()?;
        let scanner = session.scanner.clone();
        let regions = session.regions.clone();

        let found = tokio::task::spawn_blocking(move || {
            let report = progress.as_deref().map(|p| p as &(dyn Fn(f64) + Sync));
            scanner.scan_exact(&regions, &value, data_type, report)
        })
        .await
        .map_err(|e| MemoryError::Unknown(format!("scan worker failed: {}", e)))??;

        self.notify(|o| o.results_replaced(found.len()));
        Ok(found)
    }

    /// Narrows the working set by filter name (`changed`, `>`, ...)
    pub fn filter(
        &self,
        name: &str,
        value: Option<Value>,
        data_type: DataType,
    ) -> MemoryResult<Vec<SharedResult>> {
        self.apply_filter(FilterKind::from_name(name, value)?, data_type)
    }

    pub fn apply_filter(&self, kind: FilterKind, data_type: DataType) -> MemoryResult<Vec<SharedResult>> {
        let kept = self.attached()?.scanner.filter(kind, data_type)?;
        self.notify(|o| o.results_replaced(kept.len()));
        Ok(kept)
    }

    pub fn results(&self) -> Vec<SharedResult> {
        self.session
            .as_ref()
            .map_or_else(Vec::new, |s| s.scanner.results())
    }

    pub fn clear_results(&self) {
        if let Some(session) = &self.session {
            session.scanner.clear_results();
            self.notify(|o| o.results_replaced(0));
        }
    }

    // ---- direct access ------------------------------------------------

    pub fn read(&self, address: Address, data_type: DataType) -> MemoryResult<Value> {
        self.attached()?.port.read_value(address, data_type)
    }

    pub fn read_bytes(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        let session = self.attached()?;
        let limit = self.config.memory.max_read_size;
        if size > limit {
            return Err(MemoryError::ReadTooLarge { requested: size, limit });
        }
        session.port.try_read(address, size)
    }

    /// Encodes and writes, returning the bytes written
    pub fn write(&self, address: Address, value: &Value, data_type: DataType) -> MemoryResult<Vec<u8>> {
        self.attached()?.port.write_value(address, value, data_type)
    }

    pub fn write_bytes(&self, address: Address, data: &[u8]) -> MemoryResult<()> {
        self.attached()?.port.try_write(address, data)
    }

    // ---- tracked list -------------------------------------------------

    /// Tracks a working-set result as `Address_<n>`, `n` being its position
    /// in the tracked list.
    ///
    /// The result is shared, not copied. Returns false when its address is
    /// already tracked.
    pub fn adopt(&self, result: SharedResult) -> bool {
        let address = result.address();
        let added = self.tracked.add_numbered(result);
        if added {
            info!(%address, "address tracked");
        }
        added
    }

    pub fn adopt_as(&self, result: SharedResult, description: impl Into<String>) -> bool {
        let address = result.address();
        let added = self.tracked.add(result, description);
        if added {
            info!(%address, "address tracked");
        }
        added
    }

    /// Tracks a bare address; its value is unknown until the next refresh
    pub fn track_address(&self, address: Address, data_type: DataType) -> bool {
        self.tracked
            .add_numbered(ScanResult::latent(address, data_type, false).shared())
    }

    pub fn remove(&self, address: Address) -> Option<TrackedEntry> {
        let entry = self.tracked.remove(address)?;
        self.notify(|o| o.entry_removed(&entry));
        Some(entry)
    }

    /// Flips the frozen flag, returning the new state
    pub fn toggle_freeze(&self, address: Address) -> Option<bool> {
        let entry = self.tracked.get(address)?;
        let frozen = entry.result.toggle_frozen();
        self.notify(|o| o.freeze_toggled(address, frozen));
        Some(frozen)
    }

    pub fn set_frozen(&self, address: Address, frozen: bool) -> bool {
        match self.tracked.get(address) {
            Some(entry) => {
                entry.result.set_frozen(frozen);
                self.notify(|o| o.freeze_toggled(address, frozen));
                true
            }
            None => false,
        }
    }

    /// Freezes every entry, returning how many were not frozen before
    pub fn freeze_all(&self) -> usize {
        let changed = self.tracked.set_all_frozen(true);
        info!(changed, "froze all tracked addresses");
        changed
    }

    /// Unfreezes every entry, returning how many were frozen before
    pub fn unfreeze_all(&self) -> usize {
        let changed = self.tracked.set_all_frozen(false);
        info!(changed, "unfroze all tracked addresses");
        changed
    }

    /// Writes `value` with the entry's own type and records it as the snapshot.
    ///
    /// Looks in the tracked list first, then in the working set.
    pub fn edit_value(&self, address: Address, value: &Value) -> MemoryResult<()> {
        let session = self.attached()?;
        let result = self
            .tracked
            .get(address)
            .map(|e| e.result)
            .or_else(|| session.scanner.result_at(address))
            .ok_or_else(|| MemoryError::InvalidAddress(format!("{} is not tracked", address)))?;

        let bytes = session.port.write_value(address, value, result.data_type())?;
        result.set_snapshot(bytes);
        self.notify(|o| o.value_edited(address, value));
        Ok(())
    }

    pub fn rename(&self, address: Address, description: impl Into<String>) -> bool {
        self.tracked.rename(address, description)
    }

    pub fn stats(&self) -> SessionStats {
        let regions = self.regions();
        let tracked = self.tracked.len();
        let frozen = self.tracked.frozen_count();
        SessionStats {
            regions: regions.len(),
            readable_bytes: regions::total_size(regions),
            results: self.session.as_ref().map_or(0, |s| s.scanner.result_count()),
            tracked,
            frozen,
            unfrozen: tracked - frozen,
            scripts: self.scripts.len(),
        }
    }

    /// Writes the working set as `0x<ADDR>,<value>` lines after a short header
    pub fn export_results<W: Write>(&self, mut writer: W) -> MemoryResult<usize> {
        let results = self.results();
        writeln!(writer, "memscan scan results")?;
        writeln!(writer, "Total Results: {}", results.len())?;
        writeln!(writer, "{}", "=".repeat(50))?;
        writeln!(writer)?;
        for result in &results {
            match result.value() {
                Ok(value) => writeln!(writer, "0x{:X},{}", result.address().as_usize(), value)?,
                Err(_) => writeln!(writer, "0x{:X},??", result.address().as_usize())?,
            }
        }
        writer.flush()?;
        Ok(results.len())
    }

    // ---- table --------------------------------------------------------

    /// Forgets every tracked address and saved script
    pub fn new_table(&mut self) {
        self.tracked.clear();
        self.scripts.clear();
        info!("new table");
    }

    /// Replaces the tracked list and scripts with the table at `path`.
    ///
    /// Loaded entries are latent until the freeze scheduler reads them.
    pub fn load_table(&mut self, path: impl AsRef<Path>) -> MemoryResult<()> {
        let table = CheatTable::load(path)?;
        self.tracked.replace(table.tracked_entries());
        self.scripts = table.scripts;
        Ok(())
    }

    pub fn save_table(&self, path: impl AsRef<Path>) -> MemoryResult<()> {
        self.table().save(path)
    }

    /// The current tracked list and scripts as a table document
    pub fn table(&self) -> CheatTable {
        let mut table = CheatTable::new();
        table.set_entries_from(&self.tracked);
        for script in &self.scripts {
            table.add_script(script.clone());
        }
        table
    }

    // ---- scripts ------------------------------------------------------

    pub fn run_script(&mut self, code: &str) -> ScriptOutcome {
        self.host.run(code, &mut self.api)
    }

    pub fn scripts(&self) -> &[SavedScript] {
        &self.scripts
    }

    /// Saves a script, replacing any with the same name
    pub fn save_script(&mut self, name: impl Into<String>, code: impl Into<String>, auto_run: bool) {
        let script = SavedScript::new(name, code, auto_run);
        match self.scripts.iter_mut().find(|s| s.name == script.name) {
            Some(existing) => *existing = script,
            None => self.scripts.push(script),
        }
    }

    /// Runs every auto-run script in order; successful ones are marked enabled
    pub fn run_auto_scripts(&mut self) -> Vec<(String, ScriptOutcome)> {
        let mut outcomes = Vec::new();
        for index in 0..self.scripts.len() {
            if !self.scripts[index].auto_run {
                continue;
            }
            let outcome = self.host.run(&self.scripts[index].code, &mut self.api);
            let script = &mut self.scripts[index];
            if outcome.success {
                script.enabled = true;
            } else {
                warn!(script = %script.name, error = ?outcome.error, "auto-run script failed");
            }
            outcomes.push((script.name.clone(), outcome));
        }
        outcomes
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::regions::ProtectionFlags;
    use crate::process::SimulatedProcess;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SessionObserver for Recorder {
        fn freeze_toggled(&self, address: Address, frozen: bool) {
            self.events.lock().unwrap().push(format!("freeze {} {}", address, frozen));
        }

        fn value_edited(&self, address: Address, value: &Value) {
            self.events.lock().unwrap().push(format!("edit {} {}", address, value));
        }

        fn entry_removed(&self, entry: &TrackedEntry) {
            self.events.lock().unwrap().push(format!("remove {}", entry.address()));
        }

        fn results_replaced(&self, count: usize) {
            self.events.lock().unwrap().push(format!("results {}", count));
        }
    }

    fn target() -> Arc<SimulatedProcess> {
        let mut bytes = vec![0u8; 64];
        for offset in [0usize, 8, 16] {
            bytes[offset..offset + 4].copy_from_slice(&100i32.to_ne_bytes());
        }
        Arc::new(SimulatedProcess::new(77).with_region(
            0x4000,
            bytes,
            ProtectionFlags::PAGE_READWRITE,
        ))
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.scanner.parallel = false;
        config.freeze.interval_ms = 10;
        config
    }

    #[test]
    fn test_detached_operations_fail() {
        let controller = Controller::new(config());
        assert!(!controller.is_attached());
        assert!(controller.regions().is_empty());
        assert!(matches!(
            controller.read(Address::new(0x4000), DataType::Int32),
            Err(MemoryError::NotAttached)
        ));
        assert!(matches!(
            controller.filter("changed", None, DataType::Int32),
            Err(MemoryError::NotAttached)
        ));
        assert_eq!(controller.stats(), SessionStats::default());
    }

    #[test]
    fn test_attach_needs_runtime() {
        let mut controller = Controller::new(config());
        let err = controller
            .attach_capability(target(), ProcessInfo::new(77, "game"))
            .unwrap_err();
        assert!(matches!(err, MemoryError::RuntimeUnavailable(_)));
        assert!(!controller.is_attached());
    }

    #[tokio::test]
    async fn test_scan_adopt_edit_and_observe() {
        let process = target();
        let recorder = Arc::new(Recorder::default());
        let mut controller = Controller::new(config());
        controller.add_observer(recorder.clone());
        controller
            .attach_capability(process.clone(), ProcessInfo::new(77, "game"))
            .unwrap();
        assert_eq!(controller.regions().len(), 1);

        let found = controller
            .scan(Value::Int(100), DataType::Int32, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 3);

        assert!(controller.adopt(found[1].clone()));
        assert!(!controller.adopt(found[1].clone()));
        let entry = controller.tracked().get(Address::new(0x4008)).unwrap();
        assert_eq!(entry.description, "Address_1");

        controller.edit_value(Address::new(0x4008), &Value::from("250")).unwrap();
        assert_eq!(process.peek(0x4008, 4), Some(250i32.to_ne_bytes().to_vec()));
        assert_eq!(found[1].value().unwrap(), Value::Int(250));

        assert_eq!(controller.toggle_freeze(Address::new(0x4008)), Some(true));
        assert_eq!(controller.toggle_freeze(Address::new(0x9999)), None);
        assert!(controller.remove(Address::new(0x4008)).is_some());

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "results 0".to_string(),
                "results 3".to_string(),
                "edit 0x4008 250".to_string(),
                "freeze 0x4008 true".to_string(),
                "remove 0x4008".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_frozen_entry_survives_external_writes() {
        let process = target();
        let mut controller = Controller::new(config());
        controller
            .attach_capability(process.clone(), ProcessInfo::new(77, "game"))
            .unwrap();

        let found = controller.scan(Value::Int(100), DataType::Int32, None).await.unwrap();
        controller.adopt(found[0].clone());
        assert!(controller.set_frozen(Address::new(0x4000), true));

        process.poke(0x4000, &1i32.to_ne_bytes());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(process.peek(0x4000, 4), Some(100i32.to_ne_bytes().to_vec()));

        assert_eq!(controller.unfreeze_all(), 1);
        process.poke(0x4000, &5i32.to_ne_bytes());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(found[0].value().unwrap(), Value::Int(5));

        controller.detach();
        assert!(controller.results().is_empty());
        assert_eq!(controller.tracked().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_and_export() {
        let process = target();
        let mut controller = Controller::new(config());
        controller
            .attach_capability(process.clone(), ProcessInfo::new(77, "game"))
            .unwrap();
        controller.scan(Value::Int(100), DataType::Int32, None).await.unwrap();

        process.poke(0x4010, &120i32.to_ne_bytes());
        let kept = controller.filter("increased", None, DataType::Int32).unwrap();
        assert_eq!(kept.len(), 1);

        let mut out = Vec::new();
        assert_eq!(controller.export_results(&mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("memscan scan results\nTotal Results: 1\n"));
        assert!(text.ends_with("\n0x4010,120\n"));

        let stats = controller.stats();
        assert_eq!(stats.regions, 1);
        assert_eq!(stats.readable_bytes, 64);
        assert_eq!(stats.results, 1);
    }

    #[tokio::test]
    async fn test_scripts_share_the_session() {
        let process = target();
        let mut controller = Controller::new(config());
        controller
            .attach_capability(process.clone(), ProcessInfo::new(77, "game"))
            .unwrap();

        let outcome = controller.run_script("let hits = scan(100, Int32)\nprint(count(hits))");
        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.output, "3");
        assert_eq!(controller.results().len(), 3);

        controller.save_script("boost", "writeInt(0x4000, 999)", true);
        controller.save_script("broken", "nope()", true);
        controller.save_script("manual", "writeInt(0x4000, 1)", false);
        let outcomes = controller.run_auto_scripts();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.success);
        assert!(!outcomes[1].1.success);
        assert_eq!(process.peek(0x4000, 4), Some(999i32.to_ne_bytes().to_vec()));
        assert!(controller.scripts()[0].enabled);
        assert!(!controller.scripts()[1].enabled);
        assert!(!controller.scripts()[2].enabled);
    }
}
