use serde::Serialize;
use shopchat_core::catalog::{CatalogSource, SpreadsheetSource};
use shopchat_core::config::{AppConfig, LoadOptions};
use shopchat_core::errors::MODEL_NOT_LOADED_MESSAGE;

use super::{CommandResult, DOCTOR_FAILURE_EXIT};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { DOCTOR_FAILURE_EXIT };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_model_credentials(&config));
            checks.push(check_catalog(&config));
            checks.push(check_whatsapp_contact(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["model_credentials", "catalog_readable", "whatsapp_contact"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_model_credentials(config: &AppConfig) -> DoctorCheck {
    if config.llm.has_credentials() {
        return DoctorCheck {
            name: "model_credentials",
            status: CheckStatus::Pass,
            details: format!("{:?} model `{}` is configured", config.llm.provider, config.llm.model),
        };
    }

    DoctorCheck {
        name: "model_credentials",
        status: CheckStatus::Fail,
        details: format!(
            "no api key for {:?}; set SHOPCHAT_LLM_API_KEY (or GEMINI_API_KEY). \
             Chat requests will answer \"{MODEL_NOT_LOADED_MESSAGE}\"",
            config.llm.provider
        ),
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    if !config.catalog.enabled {
        return DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Skipped,
            details: "catalog disabled".to_string(),
        };
    }

    let source = SpreadsheetSource::new(config.catalog.path.clone());
    match source.load_rows() {
        Ok(rows) => DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Pass,
            details: format!("{} products read from {}", rows.len(), source.describe()),
        },
        Err(error) => DoctorCheck {
            name: "catalog_readable",
            status: CheckStatus::Fail,
            details: format!("{error}; the assistant will be told the product list failed to load"),
        },
    }
}

fn check_whatsapp_contact(config: &AppConfig) -> DoctorCheck {
    match &config.shop.whatsapp_number {
        Some(number) => DoctorCheck {
            name: "whatsapp_contact",
            status: CheckStatus::Pass,
            details: format!("order links open a chat with {number}"),
        },
        None => DoctorCheck {
            name: "whatsapp_contact",
            status: CheckStatus::Skipped,
            details: "no destination number; order links open the WhatsApp contact picker"
                .to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
