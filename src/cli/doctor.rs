//! `persona-forge doctor` - configuration and reachability diagnostics.
//!
//! Validates that everything generation and minting need is configured and
//! probes each external endpoint, so problems show up before a session
//! starts instead of halfway through a mint.

use std::path::Path;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::json;

use crate::config::Config;
use crate::crypto::parse_address;
use crate::http::{HttpClient, ProxyRewrite};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(config_path: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    println!("persona-forge Doctor");
    println!("====================\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    let config = match Config::from_env_with_toml(config_path) {
        Ok(config) => {
            check(
                "Configuration",
                CheckResult::Pass("loaded".to_string()),
                &mut passed,
                &mut failed,
            );
            config
        }
        Err(e) => {
            check(
                "Configuration",
                CheckResult::Fail(e.to_string()),
                &mut passed,
                &mut failed,
            );
            return finish(passed, failed, strict);
        }
    };

    // ── Configuration checks ──────────────────────────────────

    check(
        "LLM credential",
        check_llm_credential(&config),
        &mut passed,
        &mut failed,
    );

    check(
        "INFT contract",
        check_contract_address("INFT_CONTRACT_ADDRESS", config.mint.contract_address.as_deref()),
        &mut passed,
        &mut failed,
    );

    check(
        "Storage flow contract",
        check_contract_address("OG_FLOW_CONTRACT", config.storage.flow_contract.as_deref()),
        &mut passed,
        &mut failed,
    );

    check(
        "Mint method",
        check_mint_method(&config.mint.contract_abi),
        &mut passed,
        &mut failed,
    );

    // ── Endpoint probes ───────────────────────────────────────

    // Same proxy rewriting as the session, so the doctor sees what it sees.
    let http = HttpClient::new(PROBE_TIMEOUT)
        .with_proxy(config.http_proxy_base.clone().map(ProxyRewrite::new));
    let llm_auth = config
        .llm
        .api_key
        .as_ref()
        .map(|key| ("Authorization", format!("Bearer {}", key.expose_secret())));
    check(
        "LLM endpoint",
        probe_http_endpoint(
            &http,
            "LLM",
            &format!("{}/models", config.llm.base_url.trim_end_matches('/')),
            llm_auth,
        )
        .await,
        &mut passed,
        &mut failed,
    );

    for (index, indexer) in config.storage.indexer_urls.iter().enumerate() {
        check(
            &format!("Storage indexer #{}", index + 1),
            probe_json_rpc(&http, "indexer", indexer, "indexer_getShardedNodes").await,
            &mut passed,
            &mut failed,
        );
    }

    for (index, rpc) in config.chain.rpc_urls.iter().enumerate() {
        check(
            &format!("Chain RPC #{}", index + 1),
            probe_json_rpc(&http, "chain RPC", rpc, "eth_chainId").await,
            &mut passed,
            &mut failed,
        );
    }

    check(
        "Wallet endpoint",
        probe_json_rpc(&http, "wallet", &config.wallet.rpc_url, "web3_clientVersion").await,
        &mut passed,
        &mut failed,
    );

    finish(passed, failed, strict)
}

fn finish(passed: u32, failed: u32, strict: bool) -> anyhow::Result<()> {
    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Generation only needs the LLM checks to pass.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

// ── Individual checks ───────────────────────────────────────

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_llm_credential(config: &Config) -> CheckResult {
    match config.validate_for_generate() {
        Ok(()) => CheckResult::Pass(format!(
            "{} set ({} via {})",
            config.llm.api_key_env(),
            config.llm.model,
            config.llm.backend.as_str()
        )),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

fn check_contract_address(key: &str, address: Option<&str>) -> CheckResult {
    match address {
        Some(address) if parse_address(address.trim()).is_ok() => {
            CheckResult::Pass(mask_wallet_address(address))
        }
        Some(_) => CheckResult::Fail(format!(
            "{key} format invalid (expected 0x + 40 hex chars)"
        )),
        None => CheckResult::Fail(format!("{key} is not set; minting is disabled")),
    }
}

fn check_mint_method(abi: &[String]) -> CheckResult {
    match crate::mint::MintMethod::resolve(abi) {
        Ok(method) => CheckResult::Pass(method.signature().to_string()),
        Err(e) => CheckResult::Fail(format!("{e}; check INFT_CONTRACT_ABI")),
    }
}

fn mask_wallet_address(address: &str) -> String {
    let address = address.trim();
    if address.len() < 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

async fn probe_http_endpoint(
    http: &HttpClient,
    label: &str,
    endpoint: &str,
    auth_header: Option<(&'static str, String)>,
) -> CheckResult {
    let url = match parse_endpoint(label, endpoint) {
        Ok(url) => url,
        Err(result) => return result,
    };

    let mut request = http.get(url.as_str());
    if let Some((name, value)) = auth_header {
        request = request.header(name, value);
    }
    classify_response(label, &url, request.send().await)
}

/// POST a parameterless JSON-RPC call; any non-5xx answer counts as reachable.
async fn probe_json_rpc(http: &HttpClient, label: &str, endpoint: &str, method: &str) -> CheckResult {
    let url = match parse_endpoint(label, endpoint) {
        Ok(url) => url,
        Err(result) => return result,
    };

    let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": []});
    classify_response(label, &url, http.post(url.as_str()).json(&body).send().await)
}

fn parse_endpoint(label: &str, endpoint: &str) -> Result<reqwest::Url, CheckResult> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(CheckResult::Skip(format!("{label} endpoint not configured")));
    }
    reqwest::Url::parse(endpoint).map_err(|e| {
        CheckResult::Fail(format!(
            "{label} endpoint URL is invalid ({}): {e}",
            redact_url_for_display(endpoint)
        ))
    })
}

fn classify_response(
    label: &str,
    url: &reqwest::Url,
    response: Result<reqwest::Response, reqwest::Error>,
) -> CheckResult {
    match response {
        Ok(response) => {
            let status = response.status();
            if status.is_server_error() {
                CheckResult::Fail(format!(
                    "{label} reachable but unhealthy ({} at {})",
                    status,
                    redact_url_for_display(url.as_str())
                ))
            } else {
                CheckResult::Pass(format!(
                    "{} ({status})",
                    redact_url_for_display(url.as_str())
                ))
            }
        }
        Err(e) if e.is_timeout() => CheckResult::Fail(format!(
            "{label} timed out after {}s ({})",
            PROBE_TIMEOUT.as_secs(),
            redact_url_for_display(url.as_str())
        )),
        Err(e) => CheckResult::Fail(format!(
            "{label} unreachable ({}): {e}",
            redact_url_for_display(url.as_str())
        )),
    }
}

fn redact_url_for_display(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) => {
            if !url.username().is_empty() {
                let _ = url.set_username("redacted");
            }
            if url.password().is_some() {
                let _ = url.set_password(Some("redacted"));
            }
            url.to_string()
        }
        Err(_) => "<invalid-url>".to_string(),
    }
}
