// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ghl models` subcommands: the pricing catalog.

use clap::Subcommand;
use ghl_core::traits::NewModel;
use ghl_core::types::{AvailableModel, ModelPricing};
use ghl_core::{GhlError, ModelCatalog, ProviderType};
use ghl_cost::PricingUnit;

use crate::app::App;
use crate::clients::print_json;

#[derive(Subcommand, Debug)]
pub enum ModelCommands {
    /// List catalog entries.
    List {
        #[arg(long)]
        provider: Option<ProviderType>,
        #[arg(long)]
        json: bool,
    },
    /// Add or replace a catalog entry.
    Add {
        provider: ProviderType,
        model_id: String,
        #[arg(long)]
        display_name: Option<String>,
        /// Price of input tokens per `--unit`.
        #[arg(long)]
        input_price: Option<f64>,
        /// Price of output tokens per `--unit`.
        #[arg(long)]
        output_price: Option<f64>,
        /// "1M tokens", "1K tokens" or "token".
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        context_window: Option<u32>,
        #[arg(long)]
        max_output_tokens: Option<u32>,
    },
}

pub async fn run(app: &App, command: ModelCommands) -> Result<(), GhlError> {
    match command {
        ModelCommands::List { provider, json } => {
            let models = app.storage.list_models(provider).await?;
            if json {
                print_json(&models)?;
            } else if models.is_empty() {
                println!("catalog is empty");
            } else {
                for model in &models {
                    println!("{}", model_line(model));
                }
            }
        }
        ModelCommands::Add {
            provider,
            model_id,
            display_name,
            input_price,
            output_price,
            unit,
            context_window,
            max_output_tokens,
        } => {
            if unit.is_some() && PricingUnit::parse(unit.as_deref()).is_none() {
                return Err(GhlError::Config(format!(
                    "unknown pricing unit {:?}; use \"1M tokens\", \"1K tokens\" or \"token\"",
                    unit.unwrap_or_default()
                )));
            }
            let pricing = (input_price.is_some() || output_price.is_some()).then(|| {
                ModelPricing {
                    input: input_price,
                    output: output_price,
                    unit,
                }
            });
            let model = app
                .storage
                .upsert_model(NewModel {
                    provider_type: provider,
                    model_id,
                    display_name,
                    description: None,
                    capabilities: None,
                    pricing,
                    context_window,
                    max_output_tokens,
                })
                .await?;
            println!("saved {} {}", model.provider_type, model.model_id);
        }
    }
    Ok(())
}

fn model_line(model: &AvailableModel) -> String {
    let price = match &model.pricing {
        Some(p) => format!(
            "in {} / out {} per {}",
            p.input.map_or("-".to_string(), |v| v.to_string()),
            p.output.map_or("-".to_string(), |v| v.to_string()),
            p.unit.as_deref().unwrap_or("1M tokens"),
        ),
        None => "unpriced".to_string(),
    };
    format!(
        "{:<10} {:<40} {}",
        model.provider_type.to_string(),
        model.model_id,
        price
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpriced_models_say_so() {
        let model = AvailableModel {
            id: "m-1".into(),
            provider_type: ProviderType::Ollama,
            model_id: "llama3.1".into(),
            display_name: None,
            description: None,
            capabilities: None,
            pricing: None,
            context_window: None,
            max_output_tokens: None,
            is_active: true,
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        assert!(model_line(&model).ends_with("unpriced"));
    }
}
