//! Mode-tagged transformation stages.
//!
//! Each task declares its transformations as an ordered [`StagePlan`]. A
//! stage carries the set of modes it is active in; the plan is filtered
//! once for the active mode and then applied in declared order.

use crate::build::{Asset, BuildContext, TaskError};
use crate::mode::{Mode, ModeSet};

/// Transformation applied to an asset.
pub type StageFn = fn(Asset, &BuildContext) -> Result<Asset, TaskError>;

/// A named transformation, active in some modes.
#[derive(Clone, Copy)]
pub struct Stage {
    /// Stage name (for logs and errors)
    pub name: &'static str,
    /// Modes the stage runs in
    pub modes: ModeSet,
    apply: StageFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).field("modes", &self.modes).finish()
    }
}

/// Ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct StagePlan {
    stages: Vec<Stage>,
}

impl StagePlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, name: &'static str, modes: ModeSet, apply: StageFn) -> Self {
        self.stages.push(Stage { name, modes, apply });
        self
    }

    /// All declared stages, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Stages active in `mode`, in declared order.
    pub fn active(&self, mode: Mode) -> ActivePlan<'_> {
        ActivePlan { stages: self.stages.iter().filter(|s| s.modes.contains(mode)).collect() }
    }
}

/// A plan filtered for one mode.
#[derive(Debug)]
pub struct ActivePlan<'a> {
    stages: Vec<&'a Stage>,
}

impl ActivePlan<'_> {
    /// Names of the active stages, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Run the asset through every active stage.
    pub fn apply(&self, mut asset: Asset, ctx: &BuildContext) -> Result<Asset, TaskError> {
        for stage in &self.stages {
            tracing::debug!(stage = stage.name, asset = %asset.name, "applying stage");
            asset = (stage.apply)(asset, ctx)?;
        }
        Ok(asset)
    }
}
