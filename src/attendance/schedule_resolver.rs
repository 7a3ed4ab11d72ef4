use serde::Serialize;
use strum::Display;
use tracing::warn;
use utoipa::ToSchema;

use crate::model::schedule::{FALLBACK_SCHEDULE, ScopedSchedule, WorkSchedule};

/// Which rule produced the effective schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleSource {
    Project,
    Department,
    Default,
    /// Nothing matched; the hardcoded 08:00–17:00 is in effect.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResolvedSchedule {
    pub schedule: WorkSchedule,
    pub source: ScheduleSource,
}

/// Picks the effective schedule: project > department > organization
/// default, active schedules only. Input order never matters.
pub fn resolve(
    project_code: Option<&str>,
    department_code: Option<&str>,
    candidates: &[ScopedSchedule],
) -> ResolvedSchedule {
    let active = || candidates.iter().filter(|c| c.is_active);

    let by_project = project_code.and_then(|code| {
        active().find(|c| c.project_code.as_deref() == Some(code))
    });
    if let Some(found) = by_project {
        return ResolvedSchedule {
            schedule: found.schedule(),
            source: ScheduleSource::Project,
        };
    }

    let by_department = department_code.and_then(|code| {
        active().find(|c| c.project_code.is_none() && c.department_code.as_deref() == Some(code))
    });
    if let Some(found) = by_department {
        return ResolvedSchedule {
            schedule: found.schedule(),
            source: ScheduleSource::Department,
        };
    }

    if let Some(found) = active().find(|c| c.project_code.is_none() && c.department_code.is_none())
    {
        return ResolvedSchedule {
            schedule: found.schedule(),
            source: ScheduleSource::Default,
        };
    }

    warn!(
        project_code,
        department_code,
        candidates = candidates.len(),
        "No active work schedule matched; using fallback 08:00-17:00"
    );
    ResolvedSchedule {
        schedule: *FALLBACK_SCHEDULE,
        source: ScheduleSource::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn scoped(id: u64, project: Option<&str>, department: Option<&str>, start_h: u32) -> ScopedSchedule {
        ScopedSchedule {
            id,
            project_code: project.map(str::to_string),
            department_code: department.map(str::to_string),
            start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(start_h + 8, 0, 0).unwrap(),
            is_active: true,
        }
    }

    fn start_hour(resolved: &ResolvedSchedule) -> u32 {
        resolved.schedule.start_minute_of_day() / 60
    }

    #[test]
    fn project_schedule_wins_regardless_of_order() {
        let project = scoped(1, Some("PRJ-9"), None, 7);
        let department = scoped(2, None, Some("OPS"), 9);
        let default = scoped(3, None, None, 10);

        let orders = [
            vec![project.clone(), department.clone(), default.clone()],
            vec![default.clone(), department.clone(), project.clone()],
            vec![department.clone(), default.clone(), project.clone()],
        ];
        for candidates in orders {
            let resolved = resolve(Some("PRJ-9"), Some("OPS"), &candidates);
            assert_eq!(resolved.source, ScheduleSource::Project);
            assert_eq!(start_hour(&resolved), 7);
        }
    }

    #[test]
    fn department_then_default() {
        let candidates = vec![
            scoped(1, Some("OTHER"), None, 6),
            scoped(2, None, Some("OPS"), 9),
            scoped(3, None, None, 10),
        ];

        let resolved = resolve(Some("PRJ-9"), Some("OPS"), &candidates);
        assert_eq!(resolved.source, ScheduleSource::Department);
        assert_eq!(start_hour(&resolved), 9);

        let resolved = resolve(Some("PRJ-9"), Some("HR"), &candidates);
        assert_eq!(resolved.source, ScheduleSource::Default);
        assert_eq!(start_hour(&resolved), 10);

        let resolved = resolve(None, None, &candidates);
        assert_eq!(resolved.source, ScheduleSource::Default);
    }

    #[test]
    fn inactive_schedules_are_skipped() {
        let mut project = scoped(1, Some("PRJ-9"), None, 7);
        project.is_active = false;
        let candidates = vec![project, scoped(2, None, None, 10)];

        let resolved = resolve(Some("PRJ-9"), None, &candidates);
        assert_eq!(resolved.source, ScheduleSource::Default);
    }

    #[test]
    fn no_match_falls_back_explicitly() {
        let resolved = resolve(Some("PRJ-9"), Some("OPS"), &[scoped(1, Some("OTHER"), None, 6)]);
        assert_eq!(resolved.source, ScheduleSource::Fallback);
        assert_eq!(resolved.schedule, *FALLBACK_SCHEDULE);
    }
}
