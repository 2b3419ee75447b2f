use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use delegation_scope_encoder::{
    build_base_delegation_caveat, parse_selector, parse_target, Selection,
};
use delegation_scope_engine::EngineConfig;
use delegation_scope_types::{PolicyGroup, QuoteId};

/// Encode delegation scope policies and inspect the values the execution engine works with.
///
/// The enforcer addresses come from the engine config, so the caveat printed here is the one
/// the engine will select groups against.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Engine config JSON (enforcer addresses, TTLs, spender allow-list).
    #[arg(long, global = true, env = "SCOPE_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter directive, eg `debug` or `delegation_scope_engine=trace`.
    #[arg(long, global = true, env = "SCOPE_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the base delegation caveat for the approve/trading policy.
    EncodePolicy {
        /// Router or pool the trading group may call. Repeatable.
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Function selector the trading group may call (0x + 8 hex). Repeatable.
        #[arg(long = "selector", required = true)]
        selectors: Vec<String>,

        /// Write the JSON here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the placeholder selection args for a policy group.
    Select {
        /// `approve`, `trading` or the group index.
        #[arg(long, value_parser = parse_group)]
        group: PolicyGroup,
    },

    /// Parse a venue-prefixed quote id.
    QuoteId { id: String },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match &cli.command {
        Command::EncodePolicy {
            targets,
            selectors,
            out,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let policy = encode_policy(&config, targets, selectors)?;
            match out {
                Some(path) => {
                    write_json_atomic(path, &policy)?;
                    println!("Wrote base delegation caveat to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&policy)?),
            }
        }
        Command::Select { group } => {
            let args = Selection::placeholder(*group).encode();
            println!("0x{}", hex::encode(args));
        }
        Command::QuoteId { id } => {
            let parsed = QuoteId::parse(id).map_err(|e| anyhow!("{e}"))?;
            let value = json!({
                "venue": parsed.venue().name(),
                "local_id": parsed.local_id(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn init_tracing(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log level `{directive}`"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = path.ok_or_else(|| {
        anyhow!("missing engine config: provide --config or set SCOPE_CONFIG")
    })?;
    debug!(path = %path.display(), "loading engine config");
    EngineConfig::from_path(path)
        .with_context(|| format!("failed loading engine config from {}", path.display()))
}

fn parse_group(raw: &str) -> Result<PolicyGroup, String> {
    let trimmed = raw.trim();
    if let Ok(index) = trimmed.parse::<u8>() {
        return PolicyGroup::try_from(index)
            .map_err(|()| format!("no policy group at index {index}"));
    }
    PolicyGroup::ALL
        .into_iter()
        .find(|g| g.name().eq_ignore_ascii_case(trimmed))
        .ok_or_else(|| format!("unknown policy group `{raw}` (expected approve or trading)"))
}

fn encode_policy(config: &EngineConfig, targets: &[String], selectors: &[String]) -> Result<Value> {
    let targets = targets
        .iter()
        .map(|t| parse_target(t))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --target")?;
    let selectors = selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --selector")?;

    let caveat = build_base_delegation_caveat(&config.enforcers, &targets, &selectors)
        .context("failed encoding policy terms")?;
    info!(
        targets = targets.len(),
        selectors = selectors.len(),
        terms_len = caveat.terms.len(),
        "encoded base delegation caveat"
    );

    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let groups: Vec<Value> = PolicyGroup::ALL
        .iter()
        .map(|g| {
            json!({
                "index": g.index(),
                "name": g.name(),
                "caveats": g.caveat_count(),
            })
        })
        .collect();

    Ok(json!({
        "enforcer": caveat.enforcer.to_string(),
        "terms": format!("0x{}", hex::encode(&caveat.terms)),
        "args": "0x",
        "groups": groups,
        "targets": targets.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "selectors": selectors.iter().map(|s| format!("0x{}", hex::encode(s))).collect::<Vec<_>>(),
        "generated_at": now,
    }))
}

fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised = serde_json::to_string_pretty(value).context("failed serialising policy JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use clap::CommandFactory;
    use delegation_scope_encoder::EnforcerSet;

    fn config() -> EngineConfig {
        EngineConfig::new(EnforcerSet {
            allowed_methods: address!("1111111111111111111111111111111111111111"),
            allowed_targets: address!("2222222222222222222222222222222222222222"),
            logical_or_wrapper: address!("3333333333333333333333333333333333333333"),
        })
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn groups_parse_by_name_or_index() {
        assert_eq!(parse_group("approve"), Ok(PolicyGroup::Approve));
        assert_eq!(parse_group("Trading"), Ok(PolicyGroup::Trading));
        assert_eq!(parse_group("1"), Ok(PolicyGroup::Trading));
        assert!(parse_group("2").is_err());
        assert!(parse_group("perp").is_err());
    }

    #[test]
    fn encode_policy_emits_wrapper_caveat() {
        let policy = encode_policy(
            &config(),
            &["0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string()],
            &["0x12345678".to_string()],
        )
        .unwrap();
        assert_eq!(
            policy["enforcer"],
            json!(config().enforcers.logical_or_wrapper.to_string())
        );
        assert_eq!(policy["args"], json!("0x"));
        assert_eq!(policy["groups"][1]["caveats"], json!(2));
        assert!(policy["terms"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn encode_policy_rejects_short_selector() {
        let err = encode_policy(
            &config(),
            &["0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_string()],
            &["0x1234".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("--selector"));
    }

    #[test]
    fn policy_json_is_written_atomically() {
        let dir = std::env::temp_dir().join(format!("scopectl-test-{}", std::process::id()));
        let path = dir.join("policy.json");
        write_json_atomic(&path, &json!({ "args": "0x" })).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["args"], json!("0x"));
        assert!(!tmp_path_for(&path).exists());
        fs::remove_dir_all(dir).unwrap();
    }
}
