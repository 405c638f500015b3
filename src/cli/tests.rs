#[cfg(test)]
mod tests {
    use crate::cli::{Args, ChatCommand, Command};
    use crate::config::{LLMProvider, ReportMode, RouterMode};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["innoscope", "roadmap", "paper.pdf"]).unwrap();

        assert_eq!(
            args.command,
            Command::Roadmap {
                file: PathBuf::from("paper.pdf")
            }
        );
        assert!(args.output_path.is_none());
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(!args.stream);
        assert!(!args.parallel);
        assert!(!args.no_cache);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "innoscope",
            "summarize",
            "--text",
            "A study of soil",
            "--stream",
            "-v",
            "-o",
            "/tmp/out",
        ])
        .unwrap();

        assert!(args.stream);
        assert!(args.verbose);
        assert_eq!(args.output_path, Some(PathBuf::from("/tmp/out")));
        assert_eq!(
            args.command,
            Command::Summarize {
                text: Some("A study of soil".to_string()),
                file: None
            }
        );
    }

    #[test]
    fn test_feasibility_requires_one_source() {
        assert!(Args::try_parse_from(["innoscope", "feasibility"]).is_err());
        assert!(
            Args::try_parse_from([
                "innoscope",
                "feasibility",
                "--summary",
                "x",
                "--document",
                "a.pdf"
            ])
            .is_err()
        );

        let args =
            Args::try_parse_from(["innoscope", "feasibility", "--document", "a.docx"]).unwrap();
        assert_eq!(
            args.command,
            Command::Feasibility {
                summary: None,
                document: Some(PathBuf::from("a.docx"))
            }
        );
    }

    #[test]
    fn test_chat_subcommands() {
        let args = Args::try_parse_from([
            "innoscope",
            "chat",
            "send",
            "-m",
            "I want to build a drone",
            "--session",
            "abc",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Chat {
                action: ChatCommand::Send {
                    message: "I want to build a drone".to_string(),
                    session: Some("abc".to_string()),
                    topic: None,
                }
            }
        );

        let args = Args::try_parse_from(["innoscope", "chat", "list"]).unwrap();
        assert_eq!(
            args.command,
            Command::Chat {
                action: ChatCommand::List
            }
        );
        assert!(Args::try_parse_from(["innoscope", "chat", "roadmap"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["innoscope", "-v", "-q", "chat", "list"]).is_err());
    }

    #[test]
    fn test_into_config_overrides() {
        let args = Args::try_parse_from([
            "innoscope",
            "--llm-provider",
            "openai",
            "--model-efficient",
            "gpt-4o-mini",
            "--temperature",
            "0.4",
            "--router",
            "llm",
            "--parallel",
            "--deterministic-report",
            "--no-cache",
            "-o",
            "/tmp/results",
            "scope",
            "paper.docx",
            "--interactive",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Scope {
                file: PathBuf::from("paper.docx"),
                interactive: true
            }
        );

        let config = args.into_config().unwrap();
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model_efficient, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.4);
        assert_eq!(config.enrichment.router_mode, RouterMode::Llm);
        assert!(config.feasibility.parallel);
        assert_eq!(config.feasibility.report_mode, ReportMode::Deterministic);
        assert!(!config.cache.enabled);
        assert_eq!(config.output_path, PathBuf::from("/tmp/results"));
    }

    #[test]
    fn test_into_config_unknown_values_keep_defaults() {
        let args = Args::try_parse_from([
            "innoscope",
            "--llm-provider",
            "nonexistent",
            "--router",
            "random",
            "chat",
            "list",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.llm.provider, LLMProvider::Gemini);
        assert_eq!(config.enrichment.router_mode, RouterMode::Heuristic);
    }

    #[test]
    fn test_into_config_reads_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("innoscope.toml");
        std::fs::write(
            &path,
            "output_path = \"/from/file\"\n[feasibility]\nneutral_score = 40\n",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "innoscope",
            "--config",
            path.to_str().unwrap(),
            "chat",
            "list",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.output_path, PathBuf::from("/from/file"));
        assert_eq!(config.feasibility.neutral_score, 40);

        let args = Args::try_parse_from([
            "innoscope",
            "--config",
            "/definitely/missing.toml",
            "chat",
            "list",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}
