use chrono::{DateTime, Duration, Utc};
use egui::Color32;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the type of dependency between two tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// A dependency link between a predecessor and a successor task.
///
/// `lag_minutes` may be negative (lead time). The engine never detects
/// cycles; that is a data-quality concern of the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: Uuid,
    pub from_task: Uuid,
    pub to_task: Uuid,
    pub kind: DependencyKind,
    #[serde(default)]
    pub lag_minutes: i64,
}

impl TaskDependency {
    pub fn new(from_task: Uuid, to_task: Uuid, kind: DependencyKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_task,
            to_task,
            kind,
            lag_minutes: 0,
        }
    }

    pub fn with_lag(mut self, lag_minutes: i64) -> Self {
        self.lag_minutes = lag_minutes;
        self
    }
}

/// Phase of work inside a task. Tasks are sequences of phases; a task's
/// duration is always the sum of its phase durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseKind {
    Setup,
    Execution,
    Cleanup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration_minutes: i64,
    /// Display color for this phase segment (stored as RGBA).
    #[serde(default, with = "opt_color_serde")]
    pub color: Option<Color32>,
}

impl Phase {
    pub fn new(kind: PhaseKind, duration_minutes: i64) -> Self {
        Self {
            kind,
            duration_minutes,
            color: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Blocked,
}

/// Optional scheduling constraints honored by direct manipulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskConstraints {
    pub earliest_start: Option<DateTime<Utc>>,
    pub latest_end: Option<DateTime<Utc>>,
    /// Immovable by direct manipulation when set.
    #[serde(default)]
    pub fixed_time: bool,
}

/// A single time-boxed work item assigned to a resource.
///
/// `end_time` and `total_duration` are derived from `start_time` and
/// `phases` on every call; they are never stored and can never go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub phases: Vec<Phase>,
    pub resource_id: Uuid,
    pub order_id: Option<Uuid>,
    /// Display color for the task bar (stored as RGBA).
    #[serde(with = "color_serde")]
    pub color: Color32,
    /// Priority from 1 (highest) to 5 (lowest).
    pub priority: u8,
    pub status: TaskStatus,
    /// Progress from 0 to 100.
    pub progress: u8,
    #[serde(default)]
    pub constraints: TaskConstraints,
}

impl Task {
    /// Create a new task with sensible defaults and a single execution phase.
    pub fn new(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
        resource_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_time,
            phases: vec![Phase::new(PhaseKind::Execution, duration_minutes)],
            resource_id,
            order_id: None,
            color: Color32::from_rgb(70, 130, 180), // Steel blue
            priority: 3,
            status: TaskStatus::Scheduled,
            progress: 0,
            constraints: TaskConstraints::default(),
        }
    }

    /// Sum of all phase durations, in minutes.
    pub fn total_duration_minutes(&self) -> i64 {
        self.phases.iter().map(|p| p.duration_minutes).sum()
    }

    pub fn total_duration(&self) -> Duration {
        Duration::minutes(self.total_duration_minutes())
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.total_duration()
    }

    pub fn is_fixed(&self) -> bool {
        self.constraints.fixed_time
    }

    /// Scale every phase duration by `factor`, rounding to whole minutes.
    /// Relative phase proportions are preserved.
    pub fn scale_phases(&mut self, factor: f64) {
        for phase in &mut self.phases {
            phase.duration_minutes = (phase.duration_minutes as f64 * factor).round() as i64;
        }
    }
}

/// Serde helper for `Color32`.
pub(crate) mod color_serde {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rgba = [color.r(), color.g(), color.b(), color.a()];
        rgba.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rgba: [u8; 4] = Deserialize::deserialize(deserializer)?;
        Ok(Color32::from_rgba_premultiplied(
            rgba[0], rgba[1], rgba[2], rgba[3],
        ))
    }
}

/// Serde helper for `Option<Color32>`.
mod opt_color_serde {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(color: &Option<Color32>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        color
            .map(|c| [c.r(), c.g(), c.b(), c.a()])
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Color32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rgba: Option<[u8; 4]> = Deserialize::deserialize(deserializer)?;
        Ok(rgba.map(|c| Color32::from_rgba_premultiplied(c[0], c[1], c[2], c[3])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    #[test]
    fn end_time_follows_phases() {
        let mut task = Task::new("Mill housing", t0(), 60, Uuid::new_v4());
        assert_eq!(task.end_time(), t0() + Duration::minutes(60));

        task.phases = vec![
            Phase::new(PhaseKind::Setup, 20),
            Phase::new(PhaseKind::Execution, 100),
            Phase::new(PhaseKind::Cleanup, 20),
        ];
        assert_eq!(task.total_duration_minutes(), 140);
        assert_eq!(task.end_time(), t0() + Duration::minutes(140));

        task.start_time = t0() + Duration::hours(2);
        assert_eq!(task.end_time(), t0() + Duration::minutes(120 + 140));
    }

    #[test]
    fn scale_phases_preserves_proportions() {
        let mut task = Task::new("Grind", t0(), 60, Uuid::new_v4());
        task.phases = vec![
            Phase::new(PhaseKind::Setup, 20),
            Phase::new(PhaseKind::Execution, 100),
            Phase::new(PhaseKind::Cleanup, 20),
        ];
        task.scale_phases(0.5);
        let durations: Vec<i64> = task.phases.iter().map(|p| p.duration_minutes).collect();
        assert_eq!(durations, vec![10, 50, 10]);
        assert_eq!(task.total_duration_minutes(), 70);
    }

    #[test]
    fn task_round_trips_through_json() {
        let mut task = Task::new("Assemble", t0(), 45, Uuid::new_v4());
        task.phases.push(Phase::new(PhaseKind::Cleanup, 15));
        task.constraints.fixed_time = true;
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
        assert_eq!(back.end_time(), task.end_time());
        assert_eq!(back.total_duration_minutes(), task.total_duration_minutes());
    }
}
