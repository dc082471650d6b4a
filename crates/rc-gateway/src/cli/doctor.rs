use rc_domain::config::{Config, ConfigSeverity};

/// Run all diagnostic checks and print a summary.
///
/// Returns `Ok(true)` when every check passes, `Ok(false)` when at least
/// one check failed.
pub async fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
    println!("callcore doctor");
    println!("===============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_tcp_reachable("STT endpoint", &config.stt.endpoint, &mut all_passed).await;
    check_tcp_reachable("TTS endpoint", &config.tts.endpoint, &mut all_passed).await;
    check_llm_reachable(config, &mut all_passed).await;
    check_tenant_source(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    Ok(all_passed)
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.to_owned()
        } else {
            format!("{config_path} not found (using defaults)")
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({error_count} error(s))", issues.len()),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

/// A plain TCP dial against the endpoint's host:port — enough to confirm
/// the provider is up without performing the provider's own handshake or
/// requiring a real API key.
async fn check_tcp_reachable(label: &str, endpoint: &str, all_passed: &mut bool) {
    let reachable = match host_port(endpoint) {
        Some((host, port)) => tokio::time::timeout(
            std::time::Duration::from_secs(5),
            tokio::net::TcpStream::connect((host.as_str(), port)),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false),
        None => false,
    };

    print_check(
        label,
        reachable,
        if reachable {
            endpoint.to_owned()
        } else {
            format!("{endpoint} (unreachable)")
        },
    );
    if !reachable {
        *all_passed = false;
    }
}

async fn check_llm_reachable(config: &Config, all_passed: &mut bool) {
    let url = &config.llm.endpoint;
    let reachable = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
    {
        Ok(client) => client.get(url).send().await.is_ok(),
        Err(_) => false,
    };

    print_check(
        "LLM endpoint reachable",
        reachable,
        if reachable {
            url.clone()
        } else {
            format!("{url} (unreachable)")
        },
    );
    if !reachable {
        *all_passed = false;
    }
}

fn check_tenant_source(config: &Config, all_passed: &mut bool) {
    let path = std::path::Path::new(&config.tenant.source);
    let exists = path.exists();
    print_check(
        "Tenant source exists",
        exists,
        if exists {
            config.tenant.source.clone()
        } else {
            format!("{} not found (calls will use the generic tenant)", config.tenant.source)
        },
    );
    if !exists {
        *all_passed = false;
    }
}

/// Extract `(host, port)` from a `ws(s)://` or `http(s)://` URL without
/// pulling in a full URL-parsing dependency for this one diagnostic.
fn host_port(endpoint: &str) -> Option<(String, u16)> {
    let (scheme, rest) = endpoint.split_once("://")?;
    let default_port = match scheme {
        "ws" | "http" => 80,
        "wss" | "https" => 443,
        _ => return None,
    };
    let authority = rest.split('/').next()?;
    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
        None => Some((authority.to_string(), default_port)),
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
