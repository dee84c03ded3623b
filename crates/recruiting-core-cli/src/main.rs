//! CLI for driving the recruiting matching/bandit core: CRUD, queries,
//! scoring, team/interviewer matching, phone-screen decisions, feedback and
//! the online-learning demo.
//!
//! Structured records (`Candidate`, `Team`, `Interviewer`, `Position`,
//! patches, extracted phone-screen info) are read as JSON from a `--json
//! <PATH>` file or from stdin with `--json -`; scalar arguments (tenant,
//! ids, thresholds) are ordinary flags. Every subcommand prints the
//! engine's `Envelope<T>` as pretty JSON to stdout and exits non-zero when
//! `success` is `false`, so scripts can branch on exit status without
//! parsing the envelope.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recruiting_core::model::{Candidate, Interviewer, Position, Team};
use recruiting_core::query::CandidateFilters;
use recruiting_core::scoring::decision_engine::ExtractedInfo;
use recruiting_core::{CandidatePatch, Config, InterviewerPatch, PositionPatch, RecruitingEngine, TeamPatch};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recruiting-core", about = "Recruiting matching/bandit engine CLI", version)]
struct Cli {
    /// Path to a TOML config file overlaying the built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a candidate from a JSON `Candidate` record.
    AddCandidate(EntityArgs),
    /// Fetch a candidate by id.
    GetCandidate(IdArgs),
    /// Apply a JSON `CandidatePatch` to an existing candidate.
    UpdateCandidate(PatchArgs),

    /// Add a team from a JSON `Team` record.
    AddTeam(EntityArgs),
    /// Fetch a team by id.
    GetTeam(IdArgs),
    /// Apply a JSON `TeamPatch` to an existing team.
    UpdateTeam(PatchArgs),

    /// Add an interviewer from a JSON `Interviewer` record.
    AddInterviewer(EntityArgs),
    /// Fetch an interviewer by id.
    GetInterviewer(IdArgs),
    /// Apply a JSON `InterviewerPatch` to an existing interviewer.
    UpdateInterviewer(PatchArgs),
    /// Link an interviewer to a team (re-embeds both sides).
    LinkInterviewer {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        interviewer: String,
        #[arg(long)]
        team: String,
    },

    /// Add a position from a JSON `Position` record.
    AddPosition(EntityArgs),
    /// Fetch a position by id.
    GetPosition(IdArgs),
    /// Apply a JSON `PositionPatch` to an existing position.
    UpdatePosition(PatchArgs),

    /// Query candidates with metadata filters and an optional similarity query.
    Query {
        #[arg(long)]
        tenant: String,
        /// JSON `CandidateFilters`; omit for an unfiltered query.
        #[arg(long, value_name = "PATH_OR_DASH")]
        filters: Option<String>,
        /// Free-text similarity query. When set, runs the hybrid filter+vector query.
        #[arg(long)]
        similarity: Option<String>,
        #[arg(long, default_value_t = 20)]
        top_k: usize,
    },

    /// Rank candidates by the exceptional-talent multiplicative gate.
    FindExceptional {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        position: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        min_score: f32,
        #[arg(long, default_value_t = 20)]
        top_k: usize,
    },
    /// Score a single candidate with the exceptional-talent gate.
    ScoreCandidate {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        position: Option<String>,
    },

    /// Match a candidate to the best-fit team.
    MatchTeam {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
    },
    /// Match a candidate to the best-fit interviewer on a team.
    MatchPerson {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        team: String,
    },

    /// Run the six-layer phone-screen decision pipeline.
    Decide {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        position: String,
        /// JSON `ExtractedInfo`; omit to use all-neutral defaults.
        #[arg(long, value_name = "PATH_OR_DASH")]
        extracted: Option<String>,
    },

    /// Parse free-text feedback with the LLM adapter and update the bandit.
    Feedback {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        text: String,
    },
    /// Update the bandit directly from a numeric reward in [0, 1].
    UpdateBandit {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        reward: f32,
    },
    /// Print the aggregate precision/recall/F1/regret summary.
    LearningSummary,
    /// Dump the full per-interaction learning trace.
    LearningHistory {
        #[arg(long, value_enum, default_value = "json")]
        format: HistoryFormat,
    },
    /// Run the warm-vs-cold bandit comparison demo.
    LearningDemo {
        #[arg(long)]
        tenant: String,
        #[arg(long, value_delimiter = ',')]
        candidates: Vec<String>,
        #[arg(long)]
        position: String,
        #[arg(long, default_value_t = 200)]
        events: usize,
        #[arg(long, default_value_t = 0.6)]
        feedback_probability: f32,
    },

    /// Cluster every candidate in a tenant and write ability_cluster back.
    Cluster {
        #[arg(long)]
        tenant: String,
    },
    /// Assign a single candidate to an already-trained cluster.
    AssignCluster {
        #[arg(long)]
        tenant: String,
        #[arg(long)]
        candidate: String,
    },
    /// Recompute every interviewer's per-cluster success rate.
    ClusterRates {
        #[arg(long)]
        tenant: String,
    },

    /// Re-upsert any vector missing relative to the relational store.
    Reconcile {
        #[arg(long)]
        tenant: String,
    },
    /// Dump every entity in a tenant as a flat JSON array.
    Export {
        #[arg(long)]
        tenant: String,
    },
}

#[derive(clap::Args)]
struct EntityArgs {
    #[arg(long)]
    tenant: String,
    #[arg(long, value_name = "PATH_OR_DASH")]
    json: String,
}

#[derive(clap::Args)]
struct IdArgs {
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    id: String,
}

#[derive(clap::Args)]
struct PatchArgs {
    #[arg(long)]
    tenant: String,
    #[arg(long)]
    id: String,
    #[arg(long, value_name = "PATH_OR_DASH")]
    json: String,
}

#[derive(Clone, clap::ValueEnum)]
enum HistoryFormat {
    Json,
    Csv,
}

/// Reads `source` as a file path, or stdin when `source == "-"`.
fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading JSON from stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(source).with_context(|| format!("reading {source}"))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(source: &str) -> Result<T> {
    let text = read_source(source)?;
    serde_json::from_str(&text).with_context(|| format!("parsing JSON from {source}"))
}

fn print_envelope<T: Serialize>(envelope: recruiting_core::Envelope<T>) -> ExitCode {
    let success = envelope.success;
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("failed to serialize response: {error}"),
    }
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn build_engine(config_path: Option<&PathBuf>) -> Result<RecruitingEngine> {
    let config = Config::load(config_path.map(|p| p.as_path())).context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    RecruitingEngine::new(config).context("constructing recruiting engine")
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_ref())?;

    let code = match cli.command {
        Commands::AddCandidate(args) => {
            let candidate: Candidate = read_json(&args.json)?;
            print_envelope(engine.add_candidate(&args.tenant, candidate))
        }
        Commands::GetCandidate(args) => print_envelope(engine.get_candidate(&args.tenant, &args.id)),
        Commands::UpdateCandidate(args) => {
            let patch: CandidatePatch = read_json(&args.json)?;
            print_envelope(engine.update_candidate(&args.tenant, &args.id, patch))
        }

        Commands::AddTeam(args) => {
            let team: Team = read_json(&args.json)?;
            print_envelope(engine.add_team(&args.tenant, team))
        }
        Commands::GetTeam(args) => print_envelope(engine.get_team(&args.tenant, &args.id)),
        Commands::UpdateTeam(args) => {
            let patch: TeamPatch = read_json(&args.json)?;
            print_envelope(engine.update_team(&args.tenant, &args.id, patch))
        }

        Commands::AddInterviewer(args) => {
            let interviewer: Interviewer = read_json(&args.json)?;
            print_envelope(engine.add_interviewer(&args.tenant, interviewer))
        }
        Commands::GetInterviewer(args) => print_envelope(engine.get_interviewer(&args.tenant, &args.id)),
        Commands::UpdateInterviewer(args) => {
            let patch: InterviewerPatch = read_json(&args.json)?;
            print_envelope(engine.update_interviewer(&args.tenant, &args.id, patch))
        }
        Commands::LinkInterviewer { tenant, interviewer, team } => {
            print_envelope(engine.link_interviewer_to_team(&tenant, &interviewer, &team))
        }

        Commands::AddPosition(args) => {
            let position: Position = read_json(&args.json)?;
            print_envelope(engine.add_position(&args.tenant, position))
        }
        Commands::GetPosition(args) => print_envelope(engine.get_position(&args.tenant, &args.id)),
        Commands::UpdatePosition(args) => {
            let patch: PositionPatch = read_json(&args.json)?;
            print_envelope(engine.update_position(&args.tenant, &args.id, patch))
        }

        Commands::Query { tenant, filters, similarity, top_k } => {
            let filters: CandidateFilters = match filters {
                Some(source) => read_json(&source)?,
                None => CandidateFilters::default(),
            };
            print_envelope(engine.query_candidates(&tenant, filters, similarity.as_deref(), top_k))
        }

        Commands::FindExceptional { tenant, position, min_score, top_k } => {
            print_envelope(engine.find_exceptional_talent(&tenant, position.as_deref(), min_score, top_k))
        }
        Commands::ScoreCandidate { tenant, candidate, position } => {
            print_envelope(engine.score_candidate(&tenant, &candidate, position.as_deref()))
        }

        Commands::MatchTeam { tenant, candidate } => print_envelope(engine.match_to_team(&tenant, &candidate)),
        Commands::MatchPerson { tenant, candidate, team } => print_envelope(engine.match_to_person(&tenant, &candidate, &team)),

        Commands::Decide { tenant, candidate, position, extracted } => {
            let extracted: Option<ExtractedInfo> = match extracted {
                Some(source) => Some(read_json(&source)?),
                None => None,
            };
            print_envelope(engine.make_phone_screen_decision(&tenant, &candidate, &position, extracted))
        }

        Commands::Feedback { tenant, candidate, position, text } => {
            print_envelope(engine.process_feedback(&tenant, &candidate, &position, &text))
        }
        Commands::UpdateBandit { tenant, candidate, position, reward } => {
            print_envelope(engine.update_bandit_from_feedback(&tenant, &candidate, &position, reward))
        }
        Commands::LearningSummary => {
            println!("{}", serde_json::to_string_pretty(&engine.learning_summary())?);
            ExitCode::SUCCESS
        }
        Commands::LearningHistory { format } => {
            match format {
                HistoryFormat::Json => println!("{}", engine.learning_history_json()?),
                HistoryFormat::Csv => print!("{}", engine.learning_history_csv()),
            }
            ExitCode::SUCCESS
        }
        Commands::LearningDemo { tenant, candidates, position, events, feedback_probability } => {
            print_envelope(engine.run_learning_demo(&tenant, &candidates, &position, events, feedback_probability))
        }

        Commands::Cluster { tenant } => print_envelope(engine.cluster_candidates(&tenant)),
        Commands::AssignCluster { tenant, candidate } => print_envelope(engine.assign_cluster(&tenant, &candidate)),
        Commands::ClusterRates { tenant } => print_envelope(engine.update_interviewer_cluster_rates(&tenant)),

        Commands::Reconcile { tenant } => print_envelope(engine.reconcile(&tenant)),
        Commands::Export { tenant } => {
            let entities = engine.get_all_entities(&tenant)?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
