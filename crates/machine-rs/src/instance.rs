//! Instance model: status machine, project bindings, owned processes

use crate::config::InstanceConfig;
use crate::process::InstanceProcess;
use machine_core::{
    MachineError, MachineStatus, ProjectBinding, Result, Snapshot, SnapshotKey,
};
use machine_process::ProcessSupervisor;
use std::fmt;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

/// Backend strategy an instance delegates environment-specific work to.
///
/// One implementation covers one kind of execution environment (a
/// container runtime, a chroot, a VM). All methods may block.
pub trait InstanceBackend: Send + Sync {
    /// Mount project content into the environment.
    fn mount_project(&self, workspace_id: &str, project: &ProjectBinding) -> Result<()>;

    /// Remove a previously mounted project.
    fn unmount_project(&self, workspace_id: &str, project: &ProjectBinding) -> Result<()>;

    /// Host command that runs `command_line` inside the environment.
    fn exec_command(&self, command_line: &str) -> Command;

    /// Freeze the current environment state into a new snapshot.
    fn commit(&self, owner: &str, label: &str) -> Result<SnapshotKey>;

    /// Release every backend resource held by the environment.
    fn teardown(&self) -> Result<()>;
}

/// A running, addressable execution environment.
///
/// Status, bindings, the retained process list and the pid counter live
/// behind one lock, so a status check and the mutation it guards are
/// atomic. Blocking backend work (commit, teardown, tree kills) runs
/// outside the lock, with the status moved to the guarding state first;
/// concurrent mutators then fail their own status check instead of
/// racing.
pub struct Instance {
    config: InstanceConfig,
    backend: Box<dyn InstanceBackend>,
    supervisor: Arc<dyn ProcessSupervisor>,
    state: Mutex<InstanceState>,
}

struct InstanceState {
    status: MachineStatus,
    projects: Arc<Vec<ProjectBinding>>,
    processes: Vec<Arc<InstanceProcess>>,
    next_pid: u32,
}

impl Instance {
    /// A fresh instance in `CREATING` status.
    pub fn new(
        config: InstanceConfig,
        backend: Box<dyn InstanceBackend>,
        supervisor: Arc<dyn ProcessSupervisor>,
    ) -> Self {
        Self {
            config,
            backend,
            supervisor,
            state: Mutex::new(InstanceState {
                status: MachineStatus::Creating,
                projects: Arc::new(Vec::new()),
                processes: Vec::new(),
                next_pid: 1,
            }),
        }
    }

    pub fn id(&self) -> &str {
        self.config.id()
    }

    pub fn kind(&self) -> &str {
        self.config.kind()
    }

    pub fn owner(&self) -> &str {
        self.config.owner()
    }

    pub fn workspace_id(&self) -> &str {
        self.config.workspace_id()
    }

    pub fn display_name(&self) -> &str {
        self.config.display_name()
    }

    pub fn is_workspace_bound(&self) -> bool {
        self.config.is_workspace_bound()
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn status(&self) -> MachineStatus {
        self.lock_state().status
    }

    /// Marks the instance running once the provider has materialized it.
    pub fn mark_running(&self) -> Result<()> {
        let mut state = self.lock_state();
        self.transition(&mut state, MachineStatus::Running)
    }

    /// Marks a failed materialization; only destroy() is left afterwards.
    pub fn mark_error(&self) -> Result<()> {
        let mut state = self.lock_state();
        self.transition(&mut state, MachineStatus::Error)
    }

    /// Mount `project` and record the binding.
    ///
    /// No-op success on a workspace-bound instance, whatever its status.
    /// Otherwise requires `RUNNING`; binding an already bound path is a
    /// conflict, and the mount happens exactly once per recorded binding.
    pub fn bind_project(&self, workspace_id: &str, project: ProjectBinding) -> Result<()> {
        if self.config.is_workspace_bound() {
            return Ok(());
        }
        let mut state = self.lock_state();
        self.require_running(&state, "bind project")?;
        if state.projects.iter().any(|p| p.path() == project.path()) {
            return Err(MachineError::Conflict(format!(
                "project {} is already bound",
                project.path()
            )));
        }
        self.backend.mount_project(workspace_id, &project)?;
        let mut projects = state.projects.as_ref().clone();
        projects.push(project);
        state.projects = Arc::new(projects);
        Ok(())
    }

    /// Unmount `project` and drop its binding.
    ///
    /// No-op success on a workspace-bound instance; `NotFound` when no
    /// binding matches the path.
    pub fn unbind_project(&self, workspace_id: &str, project: &ProjectBinding) -> Result<()> {
        if self.config.is_workspace_bound() {
            return Ok(());
        }
        let mut state = self.lock_state();
        self.require_running(&state, "unbind project")?;
        if !state.projects.iter().any(|p| p.path() == project.path()) {
            return Err(MachineError::NotFound(format!(
                "project {} is not bound",
                project.path()
            )));
        }
        self.backend.unmount_project(workspace_id, project)?;
        let projects: Vec<ProjectBinding> = state
            .projects
            .iter()
            .filter(|p| p.path() != project.path())
            .cloned()
            .collect();
        state.projects = Arc::new(projects);
        Ok(())
    }

    /// Stable snapshot of the current bindings.
    ///
    /// The collection is copy-on-write: the returned snapshot never
    /// changes; mutations replace the vector wholesale.
    pub fn projects(&self) -> Arc<Vec<ProjectBinding>> {
        Arc::clone(&self.lock_state().projects)
    }

    /// New process with its pid allocated immediately.
    ///
    /// Pids are monotonic per instance, starting at 1, and independent of
    /// the instance status. The instance retains the process so destroy()
    /// can sweep it later.
    pub fn create_process(&self, command_line: &str) -> Result<Arc<InstanceProcess>> {
        let mut state = self.lock_state();
        let pid = state.next_pid;
        state.next_pid += 1;
        let command = self.backend.exec_command(command_line);
        let process = Arc::new(InstanceProcess::new(
            pid,
            command_line.to_string(),
            command,
            Arc::clone(&self.supervisor),
        ));
        state.processes.push(Arc::clone(&process));
        Ok(process)
    }

    /// Processes created on this instance, in creation order.
    pub fn processes(&self) -> Vec<Arc<InstanceProcess>> {
        self.lock_state().processes.clone()
    }

    /// Freeze the instance state into a new snapshot and return its key.
    ///
    /// Status runs `RUNNING -> SAVING -> RUNNING`; a failed commit also
    /// restores `RUNNING` and the commit error propagates.
    pub fn save_to_image(&self, owner: &str, label: &str) -> Result<SnapshotKey> {
        {
            let mut state = self.lock_state();
            self.transition(&mut state, MachineStatus::Saving)?;
        }
        let committed = self.backend.commit(owner, label);
        let restored = {
            let mut state = self.lock_state();
            self.transition(&mut state, MachineStatus::Running)
        };
        let key = committed?;
        restored?;
        Ok(key)
    }

    /// Full snapshot record for a freshly frozen state: the new key plus
    /// the instance identity, current bindings and a creation timestamp.
    pub fn save_snapshot(&self, owner: &str, label: &str, description: &str) -> Result<Snapshot> {
        let key = self.save_to_image(owner, label)?;
        let mut builder = Snapshot::builder()
            .kind(self.config.kind())
            .instance_key(key)
            .owner(owner)
            .workspace_id(self.config.workspace_id())
            .projects(self.projects().as_ref().clone())
            .description(description)
            .workspace_bound(self.config.is_workspace_bound());
        if let Some(recipe) = self.config.recipe() {
            builder = builder.recipe(recipe.clone());
        }
        builder.build()
    }

    /// Release the instance: kill retained live process trees, then tear
    /// down the backend.
    ///
    /// Terminal and idempotent; destroying a destroyed instance is a
    /// no-op success. Kill failures are logged and the sweep continues;
    /// a teardown failure propagates, with the status already terminal.
    pub fn destroy(&self) -> Result<()> {
        let processes = {
            let mut state = self.lock_state();
            if state.status == MachineStatus::Destroyed {
                return Ok(());
            }
            self.transition(&mut state, MachineStatus::Destroyed)?;
            std::mem::take(&mut state.processes)
        };
        for process in processes {
            if !process.is_alive() {
                continue;
            }
            if let Err(err) = process.kill() {
                log::warn!(
                    "instance {}: cannot kill process {}: {err}",
                    self.config.id(),
                    process.pid()
                );
            }
        }
        self.backend.teardown()
    }

    fn lock_state(&self) -> MutexGuard<'_, InstanceState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Checked transition; the legality table lives on [`MachineStatus`].
    fn transition(&self, state: &mut InstanceState, next: MachineStatus) -> Result<()> {
        if !state.status.can_transition_to(next) {
            return Err(MachineError::Machine(format!(
                "instance {} cannot move from {} to {next}",
                self.config.id(),
                state.status
            )));
        }
        log::debug!("instance {}: {} -> {next}", self.config.id(), state.status);
        state.status = next;
        Ok(())
    }

    fn require_running(&self, state: &InstanceState, operation: &str) -> Result<()> {
        if state.status != MachineStatus::Running {
            return Err(MachineError::Machine(format!(
                "cannot {operation} on instance {} in status {}",
                self.config.id(),
                state.status
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("Instance")
            .field("id", &self.config.id())
            .field("kind", &self.config.kind())
            .field("status", &state.status)
            .field("projects", &state.projects)
            .field("processes", &state.processes.len())
            .finish_non_exhaustive()
    }
}
