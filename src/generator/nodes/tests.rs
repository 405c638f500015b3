#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::sync::Arc;

    use crate::config::ReportMode;
    use crate::error::PipelineError;
    use crate::generator::graph::Node;
    use crate::generator::nodes::chat::compose_baseline;
    use crate::generator::nodes::enrich::SYNTHESIS_SEPARATOR;
    use crate::generator::nodes::feasibility::{aggregate_score, deterministic_report, parse_sub_score};
    use crate::generator::nodes::fields::{extract_fields, normalize_fields};
    use crate::generator::nodes::followup::{apply_user_response, followup_question};
    use crate::generator::nodes::ingest::parse_yes_no;
    use crate::generator::nodes::roadmap::{ROADMAP_HEADINGS, roadmap_headings_in_order};
    use crate::generator::nodes::summarize::{REFINED_HEADINGS, refined_headings};
    use crate::generator::nodes::*;
    use crate::test_support::{ScriptedModel, StaticSource, harness, harness_with_config};
    use crate::types::feasibility::{FeasibilityDimension, FeasibilitySubScore};
    use crate::types::research::{EnrichmentFindings, KnowledgeSourceKind};
    use crate::types::scoping::{ScopingField, ScopingFields};
    use crate::types::state::PipelineState;

    fn scoped_state() -> PipelineState {
        let mut state = PipelineState::from_summary("Abstract\nWe build a soil sensor network.");
        state.fields = ScopingFields {
            problem_statement: Some("Farmers over-irrigate".to_string()),
            domain: Some("Agriculture".to_string()),
            goals: vec!["Cut water use".to_string()],
            prerequisites: vec!["Sensor hardware".to_string()],
            key_topics: vec!["IoT".to_string(), "Soil moisture".to_string()],
        };
        state
    }

    fn full_roadmap() -> String {
        ROADMAP_HEADINGS
            .iter()
            .map(|h| format!("{}\nObjective: do it.", h))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("Yes"));
        assert!(parse_yes_no("  yes, it is a paper"));
        assert!(parse_yes_no("**Yes**"));
        assert!(!parse_yes_no("No"));
        assert!(!parse_yes_no("It is not. Yes?"));
        assert!(!parse_yes_no(""));
    }

    #[tokio::test]
    async fn test_check_research_sets_flag() {
        let h = harness(ScriptedModel::new().reply("appears to be a research paper", "No."));
        let mut state = PipelineState::from_text("Company newsletter");
        CheckResearchNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.is_research_like, Some(false));

        let mut empty = PipelineState::default();
        let err = CheckResearchNode
            .run(&h.context, &mut empty)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_extract_text_keeps_existing_text() {
        let h = harness(ScriptedModel::new());
        let mut state = PipelineState::from_text("already here");
        ExtractTextNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.raw_text(), "already here");

        let mut nothing = PipelineState::default();
        assert!(ExtractTextNode.run(&h.context, &mut nothing).await.is_err());
    }

    #[test]
    fn test_normalize_fields_coerces_shapes() {
        let map = json!({
            "problem_statement": "  Slow diagnosis  ",
            "domain": ["Healthcare", "AI"],
            "goals": "Reduce wait; Improve accuracy",
            "prerequisites": "data, GPUs",
            "key_topics": [" CNN ", "", 42],
        });
        let fields = normalize_fields(map.as_object().unwrap());
        assert_eq!(fields.problem_statement.as_deref(), Some("Slow diagnosis"));
        assert_eq!(fields.domain.as_deref(), Some("Healthcare, AI"));
        assert_eq!(fields.goals, vec!["Reduce wait", "Improve accuracy"]);
        assert_eq!(fields.prerequisites, vec!["data", "GPUs"]);
        assert_eq!(fields.key_topics, vec!["CNN", "42"]);
    }

    #[tokio::test]
    async fn test_extract_fields_never_errors() {
        let garbage = ScriptedModel::new().otherwise("{{{ not json at all ]");
        let fields = extract_fields(&garbage, "Extract").await;
        assert_eq!(fields, ScopingFields::default());

        let failing = ScriptedModel::new();
        let fields = extract_fields(&failing, "Extract").await;
        assert_eq!(fields, ScopingFields::default());

        let kv = ScriptedModel::new().otherwise("Domain: Robotics\nGoals: walk; run");
        let fields = extract_fields(&kv, "Extract").await;
        assert_eq!(fields.domain.as_deref(), Some("Robotics"));
        assert_eq!(fields.goals, vec!["walk", "run"]);
    }

    #[tokio::test]
    async fn test_fill_fields_never_clears_existing_values() {
        let h = harness(
            ScriptedModel::new().reply(
                "Extract the following",
                r#"{"problem_statement": "", "domain": "Hydrology", "goals": []}"#,
            ),
        );
        let mut state = scoped_state();
        FillFieldsNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.fields.problem_statement.as_deref(), Some("Farmers over-irrigate"));
        assert_eq!(state.fields.domain.as_deref(), Some("Hydrology"));
        assert_eq!(state.fields.goals, vec!["Cut water use"]);

        DetectMissingNode.run(&h.context, &mut state).await.unwrap();
        assert!(state.missing_fields.is_empty());
    }

    #[tokio::test]
    async fn test_detect_missing_order() {
        let h = harness(ScriptedModel::new());
        let mut state = PipelineState::default();
        state.fields.goals = vec!["g".to_string()];
        DetectMissingNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(
            state.missing_fields,
            vec![
                ScopingField::ProblemStatement,
                ScopingField::Domain,
                ScopingField::Prerequisites,
                ScopingField::KeyTopics
            ]
        );
    }

    #[tokio::test]
    async fn test_refine_twice_keeps_headings() {
        let h = harness(ScriptedModel::new().reply("refining a project summary", "Just prose, no headings."));
        let mut state = scoped_state();

        RefineNode.run(&h.context, &mut state).await.unwrap();
        let first = refined_headings(state.summary_text());
        assert_eq!(first, REFINED_HEADINGS.to_vec());
        assert_eq!(
            state.initial_summary.as_deref(),
            Some("Abstract\nWe build a soil sensor network.")
        );
        assert!(state.summary_text().contains("We build a soil sensor network."));

        RefineNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(refined_headings(state.summary_text()), first);
        assert!(state.summary_text().contains("- Soil moisture"));
    }

    #[tokio::test]
    async fn test_refine_accepts_model_reply_with_headings() {
        let reply = REFINED_HEADINGS
            .iter()
            .map(|h| format!("## {}\nModel text for {}.", h, h))
            .collect::<Vec<_>>()
            .join("\n\n");
        let h = harness(ScriptedModel::new().reply("refining a project summary", &reply));
        let mut state = scoped_state();
        RefineNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.summary_text(), reply);
    }

    #[tokio::test]
    async fn test_summarize_strips_fences_and_snapshots() {
        let h = harness(
            ScriptedModel::new().reply("Summarize the following research", "```markdown\n## Abstract\nA study.\n```"),
        );
        let mut state = PipelineState::from_text("raw paper text");
        SummarizeNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.summary_text(), "## Abstract\nA study.");
        assert_eq!(state.initial_summary.as_deref(), Some("## Abstract\nA study."));
    }

    #[tokio::test]
    async fn test_enrich_is_append_only() {
        let h = harness(ScriptedModel::new().reply("research arranger", "1. Executive Overview\nSynthesis."));
        let mut state = scoped_state();

        EnrichNode.run(&h.context, &mut state).await.unwrap();
        let after_first = state.research.consolidated.clone();
        assert!(after_first.starts_with("Domain: Encyclopedia domain background."));
        assert!(after_first.contains(SYNTHESIS_SEPARATOR));
        assert_eq!(h.encyclopedia.calls(), 1);
        assert_eq!(
            state.research.route.as_ref().map(|r| r.source),
            Some(KnowledgeSourceKind::Encyclopedia)
        );

        EnrichNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(h.encyclopedia.calls(), 1);
        assert_eq!(h.web.calls(), 0);
        assert!(state.research.consolidated.starts_with(&after_first));
        assert!(state.research.consolidated.len() > after_first.len());
        assert_eq!(
            state
                .research
                .research_report
                .as_deref()
                .map(|r| r.matches("Synthesis.").count()),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_enrich_failures_leave_state_unchanged() {
        let h = harness_with_config(ScriptedModel::new(), |_| {});
        let mut state = scoped_state();
        state.fields.domain = Some("Consumer retail".to_string());

        // web source is routed but the model fails to synthesize
        EnrichNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(h.web.calls(), 1);
        assert!(state.research.research_report.is_none());
        assert!(state.research.consolidated.starts_with("Domain(Web): "));
    }

    #[tokio::test]
    async fn test_enrich_skips_empty_and_failed_sources() {
        let mut h = harness(ScriptedModel::new());
        let empty = Arc::new(StaticSource::new(EnrichmentFindings::default()));
        let failing = Arc::new(StaticSource::failing());
        h.context.knowledge.encyclopedia = empty.clone();
        h.context.knowledge.web = failing.clone();

        let mut state = scoped_state();
        EnrichNode.run(&h.context, &mut state).await.unwrap();
        EnrichNode.run(&h.context, &mut state).await.unwrap();
        // 空结果不算已采集，下一轮会重新请求
        assert_eq!(empty.calls(), 2);
        assert!(!state.research.has_findings(KnowledgeSourceKind::Encyclopedia));
        assert!(state.research.consolidated.is_empty());

        state.fields.domain = Some("Consumer retail".to_string());
        EnrichNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(failing.calls(), 1);
        assert!(!state.research.has_findings(KnowledgeSourceKind::WebSearch));
        assert!(state.research.consolidated.is_empty());
    }

    #[test]
    fn test_parse_sub_score() {
        let sub = parse_sub_score("```json\n{\"score\": 72.6, \"explanation\": \"Solid\", \"recommendation\": \"Pilot\"}\n```").unwrap();
        assert_eq!(sub.score, 73);
        assert!(!sub.degraded);

        let sub = parse_sub_score("{\"score\": \"150\"}").unwrap();
        assert_eq!(sub.score, 100);
        assert_eq!(sub.explanation, "Unable to assess");

        assert!(parse_sub_score("{\"explanation\": \"no score\"}").is_none());
        assert!(parse_sub_score("{\"score\": \"NaN\", \"explanation\": \"odd\"}").is_none());
        assert!(parse_sub_score("{\"score\": \"-inf\"}").is_none());
        assert!(parse_sub_score("seventy").is_none());
    }

    #[test]
    fn test_aggregate_score_uses_successful_dimensions_only() {
        let mut scores = std::collections::BTreeMap::new();
        let ok = |score| FeasibilitySubScore {
            score,
            explanation: String::new(),
            recommendation: String::new(),
            degraded: false,
        };
        scores.insert(FeasibilityDimension::Technical, ok(80));
        scores.insert(FeasibilityDimension::Resource, ok(71));
        scores.insert(FeasibilityDimension::Skills, FeasibilitySubScore::neutral(50));
        assert_eq!(aggregate_score(&scores, 50), 76);

        let mut none = std::collections::BTreeMap::new();
        none.insert(FeasibilityDimension::Risk, FeasibilitySubScore::neutral(50));
        assert_eq!(aggregate_score(&none, 50), 50);
        assert_eq!(aggregate_score(&Default::default(), 50), 50);
    }

    #[tokio::test]
    async fn test_parallel_assessment_with_partial_failure() {
        let h = harness(
            ScriptedModel::new()
                .fail("risk analyst")
                .reply("technical expert", r#"{"score": 90, "explanation": "a", "recommendation": "b"}"#)
                .reply("resource planner", r#"{"score": 70, "explanation": "a", "recommendation": "b"}"#)
                .reply("talent manager", r#"{"score": 60, "explanation": "a", "recommendation": "b"}"#)
                .reply("project manager", "no json here"),
        );
        let mut state = scoped_state();
        AssessAllNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.feasibility.sub_scores.len(), 5);
        assert!(state.feasibility.sub_scores[&FeasibilityDimension::Risk].degraded);
        assert!(state.feasibility.sub_scores[&FeasibilityDimension::Scope].degraded);

        FeasibilityReportNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.feasibility.final_score, Some(73));
        let report = state.feasibility.final_report.as_deref().unwrap();
        assert!(report.starts_with("FEASIBILITY ASSESSMENT REPORT\nOverall Score: 73/100"));
        assert_eq!(
            state.feasibility.overall_explanation.as_deref(),
            Some("Overall feasibility score: 73/100. See detailed report for breakdown.")
        );
    }

    #[tokio::test]
    async fn test_non_finite_score_degrades_to_neutral() {
        let h = harness(
            ScriptedModel::new()
                .reply("technical expert", r#"{"score": "NaN", "explanation": "a", "recommendation": "b"}"#)
                .otherwise(r#"{"score": 80, "explanation": "a", "recommendation": "b"}"#),
        );
        let mut state = scoped_state();
        AssessAllNode.run(&h.context, &mut state).await.unwrap();
        let technical = &state.feasibility.sub_scores[&FeasibilityDimension::Technical];
        assert!(technical.degraded);
        assert_eq!(technical.score, 50);

        FeasibilityReportNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.feasibility.final_score, Some(80));
    }

    #[tokio::test]
    async fn test_sequential_dimension_node_and_llm_report() {
        let h = harness(
            ScriptedModel::new()
                .reply("executive summary expert", "Executive Summary\nViable.")
                .reply("technical expert", r#"{"score": 64, "explanation": "ok", "recommendation": "go"}"#),
        );
        let mut state = scoped_state();
        AssessDimensionNode(FeasibilityDimension::Technical)
            .run(&h.context, &mut state)
            .await
            .unwrap();
        FeasibilityReportNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(state.feasibility.final_score, Some(64));
        assert_eq!(
            state.feasibility.final_report.as_deref(),
            Some("Executive Summary\nViable.")
        );
    }

    #[tokio::test]
    async fn test_deterministic_report_mode_skips_model() {
        let h = harness_with_config(ScriptedModel::new().otherwise("unused"), |config| {
            config.feasibility.report_mode = ReportMode::Deterministic;
        });
        let mut state = scoped_state();
        state
            .feasibility
            .sub_scores
            .insert(FeasibilityDimension::Scope, FeasibilitySubScore::neutral(50));
        FeasibilityReportNode.run(&h.context, &mut state).await.unwrap();
        assert!(h.llm.prompts().is_empty());
        // 未评估的维度补为中性分数
        assert!(state.feasibility.is_assessed());
        assert!(state.feasibility.sub_scores.values().all(|s| s.degraded));
        assert_eq!(state.feasibility.final_score, Some(50));
        let report = state.feasibility.final_report.unwrap();
        assert_eq!(report, deterministic_report(50, &state.feasibility.sub_scores));
        assert!(report.contains("- Scope: 50/100"));
    }

    #[test]
    fn test_roadmap_headings_in_order() {
        assert!(roadmap_headings_in_order(&full_roadmap()));

        let mut swapped: Vec<&str> = ROADMAP_HEADINGS.to_vec();
        swapped.swap(0, 1);
        assert!(!roadmap_headings_in_order(&swapped.join("\n")));
        assert!(!roadmap_headings_in_order(&ROADMAP_HEADINGS[..7].join("\n")));
    }

    #[tokio::test]
    async fn test_roadmap_uses_highest_fidelity_context() {
        let h = harness(ScriptedModel::new().reply("expert product strategist", &full_roadmap()));
        let mut state = scoped_state();
        state.research.append_consolidated("consolidated notes");
        state.research.research_report = Some("synthesized report".to_string());

        RoadmapNode.run(&h.context, &mut state).await.unwrap();
        assert!(roadmap_headings_in_order(state.roadmap.as_deref().unwrap()));
        let prompt = &h.llm.prompts()[0];
        assert!(prompt.contains("synthesized report"));
        assert!(!prompt.contains("consolidated notes"));
    }

    #[tokio::test]
    async fn test_generate_question_falls_back() {
        let h = harness(ScriptedModel::new().reply("helpful scoping assistant", "  "));
        let mut state = PipelineState::default();
        state.refresh_missing();
        GenerateQuestionNode.run(&h.context, &mut state).await.unwrap();
        assert_eq!(
            state.conversation.reply_text.as_deref(),
            Some("What problem are you trying to solve?")
        );
        assert!(!state.conversation.completed);
    }

    #[tokio::test]
    async fn test_chat_completion_nodes() {
        let h = harness(ScriptedModel::new().reply("research writer", "Long form summary."));
        let mut state = scoped_state();
        state.summary = None;
        state.initial_summary = None;

        ComposeBaselineNode.run(&h.context, &mut state).await.unwrap();
        assert!(state.summary_text().starts_with("Problem Statement: Farmers over-irrigate"));
        RefineResearchStyleNode.run(&h.context, &mut state).await.unwrap();
        FinalizeNode.run(&h.context, &mut state).await.unwrap();

        assert_eq!(state.summary_text(), "Long form summary.");
        assert!(state.initial_summary.as_deref().unwrap().contains("Goals:\n- Cut water use"));
        assert_eq!(state.conversation.reply_text.as_deref(), Some("Long form summary."));
        assert!(state.conversation.completed);
    }

    #[test]
    fn test_compose_baseline_empty() {
        assert_eq!(
            compose_baseline(&ScopingFields::default()),
            "Project scope details summarized."
        );
    }

    #[tokio::test]
    async fn test_apply_user_response() {
        let mut state = PipelineState::default();
        state.fields.problem_statement = Some("Known problem".to_string());
        state.refresh_missing();
        assert_eq!(
            followup_question(&state.missing_fields).unwrap(),
            "To complete your research roadmap, please provide: domain, goals, prerequisites, key_topics. You can reply in JSON or simple 'key: value' lines."
        );

        let llm = ScriptedModel::new().reply(
            "helping fill missing fields",
            r#"{"domain": "Energy", "goals": ["Store heat"], "problem_statement": "Overwrite attempt"}"#,
        );
        apply_user_response(&llm, &mut state, "it's energy, we want to store heat").await;
        assert_eq!(state.fields.domain.as_deref(), Some("Energy"));
        assert_eq!(state.fields.problem_statement.as_deref(), Some("Known problem"));
        assert_eq!(
            state.missing_fields,
            vec![ScopingField::Prerequisites, ScopingField::KeyTopics]
        );

        let failing = ScriptedModel::new();
        apply_user_response(&failing, &mut state, "Prerequisites: permits; funding\nKey topics: thermal storage")
            .await;
        assert_eq!(state.fields.prerequisites, vec!["permits", "funding"]);
        assert_eq!(state.fields.key_topics, vec!["thermal storage"]);
        assert!(state.missing_fields.is_empty());
        assert!(followup_question(&state.missing_fields).is_none());
    }
}
