//! Declarative launch descriptions.
//!
//! A [`LaunchDescription`] is an ordered list of processes and lifecycle
//! directives. It is built once through [`LaunchDescriptionBuilder`] and then
//! handed, immutably, to a [`ProcessSupervisor`](crate::ProcessSupervisor).

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::ParameterSet;

/// Where a process writes its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Share the harness's standard output and error streams.
    #[default]
    Screen,
    /// Capture output and forward it line by line to the logger.
    Log,
}

/// A process to start, with everything it reads at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    name: String,
    executable: Utf8PathBuf,
    arguments: Vec<String>,
    parameters: ParameterSet,
    output: OutputMode,
}

impl ProcessSpec {
    /// Describe `executable`, started under `name` with `parameters`.
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<Utf8PathBuf>,
        parameters: ParameterSet,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            arguments: Vec::new(),
            parameters,
            output: OutputMode::default(),
        }
    }

    /// Append command-line arguments placed before the parameter arguments.
    #[must_use]
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Choose where output goes.
    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Process name, also used as the node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the executable.
    #[must_use]
    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }

    /// Extra command-line arguments.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Parameters handed over at startup.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Output routing.
    #[must_use]
    pub const fn output(&self) -> OutputMode {
        self.output
    }
}

/// Lifecycle directives interpreted by the supervision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Hold the session open after its processes exit, until the runner
    /// shuts it down.
    KeepAlive,
    /// Tell the orchestrator that setup is complete and active tests may run.
    ReadyToTest,
}

/// One entry of a launch description.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchEntry {
    /// Start a process.
    Process(ProcessSpec),
    /// Apply a lifecycle directive.
    Directive(Directive),
}

/// Immutable, ordered launch description.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchDescription {
    entries: Vec<LaunchEntry>,
}

impl LaunchDescription {
    /// Start building a description.
    #[must_use]
    pub const fn builder() -> LaunchDescriptionBuilder {
        LaunchDescriptionBuilder {
            entries: Vec::new(),
        }
    }

    /// Entries in launch order.
    #[must_use]
    pub fn entries(&self) -> &[LaunchEntry] {
        &self.entries
    }

    /// Process entries in launch order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessSpec> {
        self.entries.iter().filter_map(|entry| match entry {
            LaunchEntry::Process(spec) => Some(spec),
            LaunchEntry::Directive(_) => None,
        })
    }

    /// Whether `directive` appears anywhere in the description.
    #[must_use]
    pub fn has_directive(&self, directive: Directive) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, LaunchEntry::Directive(found) if *found == directive))
    }

    /// Look up a process by name.
    #[must_use]
    pub fn process(&self, name: &str) -> Option<&ProcessSpec> {
        self.processes().find(|spec| spec.name() == name)
    }
}

/// Accumulates launch entries in order.
#[derive(Debug, Default)]
pub struct LaunchDescriptionBuilder {
    entries: Vec<LaunchEntry>,
}

impl LaunchDescriptionBuilder {
    /// Append a process.
    #[must_use]
    pub fn process(mut self, spec: ProcessSpec) -> Self {
        self.entries.push(LaunchEntry::Process(spec));
        self
    }

    /// Append [`Directive::KeepAlive`].
    #[must_use]
    pub fn keep_alive(mut self) -> Self {
        self.entries.push(LaunchEntry::Directive(Directive::KeepAlive));
        self
    }

    /// Append [`Directive::ReadyToTest`].
    #[must_use]
    pub fn ready_to_test(mut self) -> Self {
        self.entries
            .push(LaunchEntry::Directive(Directive::ReadyToTest));
        self
    }

    /// Freeze the accumulated entries.
    #[must_use]
    pub fn build(self) -> LaunchDescription {
        LaunchDescription {
            entries: self.entries,
        }
    }
}

/// Named handles onto launched processes, for use by assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchFixtures {
    processes: BTreeMap<String, String>,
}

impl LaunchFixtures {
    /// Expose the process called `process` under the fixture name `fixture`.
    #[must_use]
    pub fn with_process(mut self, fixture: impl Into<String>, process: impl Into<String>) -> Self {
        self.processes.insert(fixture.into(), process.into());
        self
    }

    /// Process name registered under `fixture`.
    #[must_use]
    pub fn process(&self, fixture: &str) -> Option<&str> {
        self.processes.get(fixture).map(String::as_str)
    }

    /// All `(fixture, process)` pairs, ordered by fixture name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.processes
            .iter()
            .map(|(fixture, process)| (fixture.as_str(), process.as_str()))
    }
}
