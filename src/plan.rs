//! Curriculum plans returned by the backend and their daily-plan table projection

use serde::{Deserialize, Serialize};

/// A multi-week learning plan attached to an assistant reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumPlan {
    pub topic: String,
    pub level: String,
    #[serde(rename = "durationWeeks")]
    pub duration_weeks: u32,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(rename = "youtubeLinks", alias = "videoLinks", default)]
    pub video_links: Vec<String>,
    #[serde(rename = "linkedinLinks", alias = "articleLinks", default)]
    pub article_links: Vec<String>,
}

/// One week of a curriculum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Activity per day; index 0 is day 1
    #[serde(rename = "dailyPlan", default)]
    pub daily_schedule: Vec<String>,
}

/// A single row of the daily-plan table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub key: String,
    pub day_label: String,
    pub focus: String,
    pub activity: String,
}

/// Flatten a plan into table rows, module order first, then day order.
pub fn project_rows(plan: Option<&CurriculumPlan>) -> Vec<PlanRow> {
    let Some(plan) = plan else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (index, module) in plan.modules.iter().enumerate() {
        let week = index + 1;
        for (day_index, activity) in module.daily_schedule.iter().enumerate() {
            rows.push(PlanRow {
                key: format!("{}-{}", week, day_index),
                day_label: format!("Week {} · Day {}", week, day_index + 1),
                focus: module.title.clone(),
                activity: activity.clone(),
            });
        }
    }
    rows
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    pub(crate) fn module(title: &str, days: &[&str]) -> Module {
        Module {
            title: title.to_string(),
            description: format!("{} basics", title),
            daily_schedule: days.iter().map(|d| d.to_string()).collect(),
        }
    }

    pub(crate) fn sample_plan() -> CurriculumPlan {
        CurriculumPlan {
            topic: "Go".to_string(),
            level: "Beginner".to_string(),
            duration_weeks: 2,
            modules: vec![module("A", &["x", "y"]), module("B", &["z"])],
            video_links: vec!["https://youtube.com/watch?v=go".to_string()],
            article_links: vec![],
        }
    }

    #[test]
    fn test_rows_follow_module_then_day_order() {
        let rows = project_rows(Some(&sample_plan()));
        let triples: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| (r.day_label.as_str(), r.focus.as_str(), r.activity.as_str()))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("Week 1 · Day 1", "A", "x"),
                ("Week 1 · Day 2", "A", "y"),
                ("Week 2 · Day 1", "B", "z"),
            ]
        );
    }

    #[test]
    fn test_empty_schedule_contributes_nothing_but_keeps_week_numbering() {
        let mut plan = sample_plan();
        plan.modules.insert(1, module("Rest", &[]));
        let rows = project_rows(Some(&plan));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].day_label, "Week 3 · Day 1");
        assert_eq!(rows[2].focus, "B");
    }

    #[test]
    fn test_absent_plan_yields_no_rows() {
        assert!(project_rows(None).is_empty());
    }

    #[test]
    fn test_duplicate_activities_are_kept_with_unique_keys() {
        let mut plan = sample_plan();
        plan.modules = vec![module("A", &["same", "same"]), module("B", &["same"])];
        let rows = project_rows(Some(&plan));
        assert_eq!(rows.len(), 3);
        let keys: HashSet<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_projection_is_repeatable() {
        let plan = sample_plan();
        assert_eq!(project_rows(Some(&plan)), project_rows(Some(&plan)));
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "topic": "Python",
            "level": "Beginner",
            "durationWeeks": 4,
            "modules": [
                {"title": "Basics", "description": "Syntax", "dailyPlan": ["Install", "Variables"]},
                {"title": "Functions", "description": "def"}
            ],
            "youtubeLinks": ["https://youtube.com/a"],
            "linkedinLinks": ["https://linkedin.com/b"]
        }"#;
        let plan: CurriculumPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.duration_weeks, 4);
        assert_eq!(plan.modules[0].daily_schedule, vec!["Install", "Variables"]);
        assert!(plan.modules[1].daily_schedule.is_empty());
        assert_eq!(plan.video_links, vec!["https://youtube.com/a"]);
        assert_eq!(plan.article_links, vec!["https://linkedin.com/b"]);
    }

    #[test]
    fn test_deserialize_accepts_generic_link_names() {
        let json = r#"{
            "topic": "Rust", "level": "Intermediate", "durationWeeks": 1,
            "modules": [],
            "videoLinks": ["v"], "articleLinks": ["a"]
        }"#;
        let plan: CurriculumPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.video_links, vec!["v"]);
        assert_eq!(plan.article_links, vec!["a"]);
    }
}
