//! Per-entity execution loop
//!
//! Every entity is attempted exactly once and produces exactly one outcome.
//! A failing entity never stops the others.

use std::path::Path;

use rayon::prelude::*;

use crate::command::{build_command, builder::resolve_restore_file, UsernameRewrite};
use crate::error::{PgBatchError, PgBatchResult};
use crate::models::{EntityRecord, ExecutionOutcome, Mode, RunReport, RunStamp, SharedSettings};
use crate::runner::ProcessRunner;

/// Drives the external tool once per entity and collects the outcomes
pub struct Orchestrator<'a> {
    runner: &'a dyn ProcessRunner,
    parallelism: usize,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self {
            runner,
            parallelism: 1,
        }
    }

    /// Process up to `parallelism` entities at once
    ///
    /// Report order stays the input order regardless of the value.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Attempt every entity and return the ordered report
    ///
    /// # Errors
    ///
    /// Fails only before any entity is attempted: when a shared key the mode
    /// needs is missing, or the worker pool cannot be built.
    pub fn run(
        &self,
        mode: Mode,
        shared: &SharedSettings,
        entities: &[EntityRecord],
        stamp: &RunStamp,
        working_dir: &Path,
    ) -> PgBatchResult<RunReport> {
        for key in mode.required_shared_keys() {
            shared.require(key)?;
        }

        log::info!(
            "Starting {} of {} database(s) with stamp {}",
            mode,
            entities.len(),
            stamp
        );

        let outcomes: Vec<ExecutionOutcome> = if self.parallelism > 1 && entities.len() > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallelism)
                .build()
                .map_err(|e| PgBatchError::Config(format!("Failed to start worker pool: {}", e)))?;
            pool.install(|| {
                entities
                    .par_iter()
                    .map(|entity| self.attempt(mode, shared, entity, stamp, working_dir))
                    .collect()
            })
        } else {
            entities
                .iter()
                .map(|entity| self.attempt(mode, shared, entity, stamp, working_dir))
                .collect()
        };

        let mut report = RunReport::new(mode);
        for outcome in outcomes {
            report.push(outcome);
        }

        log::info!(
            "Finished {}: {} succeeded, {} failed",
            mode,
            report.len() - report.failure_count(),
            report.failure_count()
        );

        Ok(report)
    }

    /// Attempt one entity; every error is folded into a `Failure`
    fn attempt(
        &self,
        mode: Mode,
        shared: &SharedSettings,
        entity: &EntityRecord,
        stamp: &RunStamp,
        working_dir: &Path,
    ) -> ExecutionOutcome {
        match self.prepare_and_run(mode, shared, entity, stamp, working_dir) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Skipping '{}' (line {}): {}", entity.id(), entity.line(), e);
                ExecutionOutcome::failure(entity.id(), e.to_string())
            }
        }
    }

    fn prepare_and_run(
        &self,
        mode: Mode,
        shared: &SharedSettings,
        entity: &EntityRecord,
        stamp: &RunStamp,
        working_dir: &Path,
    ) -> PgBatchResult<ExecutionOutcome> {
        if mode == Mode::Restore {
            if let Some(rewrite) = UsernameRewrite::for_entity(shared, entity)? {
                let file = resolve_restore_file(entity.restore_filename()?, working_dir);
                let count = rewrite.apply_to_file(&file)?;
                log::info!(
                    "Rewrote {} occurrence(s) of '{}' to '{}' in {}",
                    count,
                    rewrite.from,
                    rewrite.to,
                    file.display()
                );
            }
        }

        let spec = build_command(mode, shared, entity, stamp, working_dir)?;
        let secret = entity.password()?;
        Ok(self.runner.run(&spec, secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandSpec;
    use crate::config::parse_properties;
    use crate::models::Secret;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Fails the configured entities and records every call
    #[derive(Default)]
    struct FakeRunner {
        failures: HashMap<String, String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeRunner {
        fn failing(entity: &str, stderr: &str) -> Self {
            let mut runner = Self::default();
            runner.failures.insert(entity.into(), stderr.into());
            runner
        }

        fn called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, spec: &CommandSpec, secret: &Secret) -> ExecutionOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((spec.entity.clone(), secret.expose().to_string()));
            match self.failures.get(&spec.entity) {
                Some(stderr) => ExecutionOutcome::failure(&spec.entity, stderr),
                None => ExecutionOutcome::success(&spec.entity),
            }
        }
    }

    const THREE: &str = "\
database_server=db1
port=5432
db=alpha||username=alice||password=p1
db=beta||username=bob||password=p2
db=gamma||username=carol||password=p3
";

    fn stamp() -> RunStamp {
        RunStamp::now()
    }

    #[test]
    fn test_failure_does_not_stop_later_entities() {
        let props = parse_properties(THREE).unwrap();
        let runner = FakeRunner::failing("bob", "permission denied");

        let report = Orchestrator::new(&runner)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(runner.called(), vec!["alice", "bob", "carol"]);
        assert_eq!(report.successes(), vec!["alice", "carol"]);
        assert_eq!(report.failures(), vec!["bob - permission denied"]);
    }

    #[test]
    fn test_each_entity_gets_its_own_secret() {
        let props = parse_properties(THREE).unwrap();
        let runner = FakeRunner::default();

        Orchestrator::new(&runner)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap();

        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("alice".to_string(), "p1".to_string()),
                ("bob".to_string(), "p2".to_string()),
                ("carol".to_string(), "p3".to_string()),
            ]
        );
    }

    #[test]
    fn test_parallel_run_keeps_input_order() {
        let mut text = String::from("psql_path=\ndatabase_server=db1\nport=5432\n");
        for i in 0..40 {
            text.push_str(&format!("db=d{i}||username=u{i}||password=p{i}\n"));
        }
        let props = parse_properties(&text).unwrap();
        let runner = FakeRunner::failing("u7", "boom");

        let report = Orchestrator::new(&runner)
            .with_parallelism(8)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap();

        assert_eq!(report.len(), 40);
        let ids: Vec<&str> = report.outcomes.iter().map(|o| o.entity()).collect();
        let expected: Vec<String> = (0..40).map(|i| format!("u{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(report.failures(), vec!["u7 - boom"]);
    }

    #[test]
    fn test_missing_shared_key_is_fatal() {
        let props = parse_properties("port=5432\ndb=a||username=u||password=p\n")
            .unwrap();
        let runner = FakeRunner::default();

        let err = Orchestrator::new(&runner)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap_err();

        assert!(matches!(err, PgBatchError::MissingConfigKey(k) if k == "database_server"));
        assert!(runner.called().is_empty());
    }

    #[test]
    fn test_tool_prefix_is_optional() {
        let props = parse_properties(
            "port=5432\ndatabase_server=db1\n\
             db=alpha||username=alice||password=p1\n\
             db=beta||username=bob||password=p2\n",
        )
        .unwrap();
        let runner = FakeRunner::failing("bob", "permission denied");

        let report = Orchestrator::new(&runner)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap();

        assert_eq!(report.successes(), vec!["alice"]);
        assert_eq!(report.failures(), vec!["bob - permission denied"]);
    }

    #[test]
    fn test_missing_entity_key_is_recorded_as_failure() {
        let props = parse_properties(
            "psql_path=\ndatabase_server=db1\nport=5432\n\
             db=alpha||username=alice\n\
             db=beta||username=bob||password=p2\n",
        )
        .unwrap();
        let runner = FakeRunner::default();

        let report = Orchestrator::new(&runner)
            .run(Mode::Backup, &props.shared, &props.entities, &stamp(), Path::new("out"))
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report.successes(), vec!["bob"]);
        assert_eq!(
            report.failures(),
            vec!["alice - Missing configuration key: password"]
        );
        assert_eq!(runner.called(), vec!["bob"]);
    }

    #[test]
    fn test_restore_rewrites_file_before_running() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("alice.sql"),
            "CREATE SCHEMA alice;\n",
        )
        .unwrap();
        let props = parse_properties(
            "psql_path=\ndatabase_server=db1\nport=5432\n\
             from_username=alice\nto_username=dave\n\
             db=alpha||username=dave||password=p1||restore_filename=alice.sql\n",
        )
        .unwrap();
        let runner = FakeRunner::default();

        let report = Orchestrator::new(&runner)
            .run(Mode::Restore, &props.shared, &props.entities, &stamp(), temp_dir.path())
            .unwrap();

        assert_eq!(report.successes(), vec!["dave"]);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("alice.sql")).unwrap(),
            "CREATE SCHEMA dave;\n"
        );
    }

    #[test]
    fn test_restore_missing_file_is_entity_failure() {
        let temp_dir = TempDir::new().unwrap();
        let props = parse_properties(
            "psql_path=\ndatabase_server=db1\nport=5432\nfrom_username=a\nto_username=b\n\
             db=alpha||username=u||password=p||restore_filename=absent.sql\n",
        )
        .unwrap();
        let runner = FakeRunner::default();

        let report = Orchestrator::new(&runner)
            .run(Mode::Restore, &props.shared, &props.entities, &stamp(), temp_dir.path())
            .unwrap();

        assert_eq!(report.failure_count(), 1);
        assert!(runner.called().is_empty());
    }
}
