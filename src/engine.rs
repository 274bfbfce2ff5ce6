use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{FindingLog, Report, Section, Stage};
use crate::probe::LiveProbe;
use crate::rules::{self, RuleContext};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub timeout: Duration,
    pub verbose: bool,
    pub test_mode: bool,
    pub exclude: Vec<String>,
    pub show_progress: bool,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
    home_dir: PathBuf,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Result<Self> {
        let home_dir = crate::platform::effective_home_dir()?;
        Ok(Self { opts, home_dir })
    }

    pub fn home_dir(&self) -> &std::path::Path {
        &self.home_dir
    }

    /// 固定順のパイプラインを一度だけ実行し、レポートを組み立てる。
    /// ステージ内部の失敗は「情報なし」へ縮退し、ここまで届かない。
    pub fn scan(&self) -> Result<Report> {
        let started_at = OffsetDateTime::now_utc();
        let deadline = Instant::now() + self.opts.timeout;
        let probe = LiveProbe::new(
            std::cmp::min(self.opts.timeout, Duration::from_secs(8)),
            Some(deadline),
            self.home_dir.clone(),
        );

        use std::io::IsTerminal;
        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let profile = rules::build_host_profile(&probe);
        let ctx = RuleContext {
            profile: profile.clone(),
            verbose: self.opts.verbose,
            test_mode: self.opts.test_mode,
            exclude: rules::build_exclude_set(&self.opts.exclude)?,
        };

        let mut log = FindingLog::new();
        let mut sections = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            if let Some(pb) = &pb {
                pb.set_message(format!("検査中: {}", stage.title()));
            }
            let facts = rules::run_stage(stage, &ctx, &probe, &mut log);
            sections.push(Section { stage, facts });
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let generated_at = started_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(Report {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            host: profile,
            summary: log.summary(),
            findings: log.into_findings(),
            sections,
        })
    }
}
