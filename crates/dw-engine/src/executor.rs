//! Executor tick (spec.md §4.7.3): dispatches APPROVED commands, bounded by
//! `config.executor_batch_size` per fire. Also runs the stale-APPROVED sweep
//! before the main scan.
//!
//! The `APPROVED -> EXECUTING` transition is a CAS in `dw-repo::set_command_status`
//! (`where status = $from`); losing that race here is not an error, it means
//! another executor fire (or, in a multi-process deployment, another process)
//! already claimed the command, so this fire skips it and moves on (I3).

use std::sync::Arc;

use dw_schemas::{CommandStatus, DocSecrets, ChainKeypair};

use crate::context::TickContext;
use crate::mirror::{approval_url, audit, command_row, record_activity};

fn empty_secrets() -> DocSecrets {
    DocSecrets {
        chain_a: ChainKeypair {
            address: String::new(),
            private_key: String::new(),
        },
        chain_b: None,
    }
}

pub async fn run(ctx: Arc<TickContext>) -> anyhow::Result<()> {
    sweep_stale(&ctx).await?;

    let batch = ctx
        .repo
        .list_next_approved_commands(ctx.config.executor_batch_size as i64)
        .await?;

    for cmd in batch {
        if let Err(e) = execute_one(&ctx, cmd.cmd_id.clone()).await {
            tracing::warn!(cmd_id = %cmd.cmd_id, error = %e, "executor failed on command");
        }
    }

    Ok(())
}

async fn sweep_stale(ctx: &TickContext) -> anyhow::Result<()> {
    let threshold = chrono::Duration::from_std(ctx.config.stale_sweep_threshold)
        .unwrap_or_else(|_| chrono::Duration::seconds(3600));
    let swept = ctx.repo.fail_stale_approved_commands(threshold).await?;
    for cmd_id in swept {
        let Some(cmd) = ctx.repo.get_command(&cmd_id).await? else {
            continue;
        };
        let url = approval_url(&ctx.config.public_base_url, &cmd.doc_id, &cmd_id);
        ctx.document.write_command_row(&cmd.doc_id, command_row(&cmd, url)).await?;
        audit(ctx, &cmd.doc_id, format!("{cmd_id} FAILED (stale)")).await?;
    }
    Ok(())
}

async fn execute_one(ctx: &TickContext, cmd_id: String) -> anyhow::Result<()> {
    // Claim the command first; a lost CAS race means someone else got it.
    if let Err(dw_repo::RepoError::IllegalTransition(_)) = ctx
        .repo
        .set_command_status(&cmd_id, CommandStatus::Executing, None, None)
        .await
    {
        return Ok(());
    }

    let cmd = ctx
        .repo
        .get_command(&cmd_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("executing command {cmd_id} vanished mid-tick"))?;

    let parsed = match cmd.parsed() {
        Some(p) => p,
        None => {
            fail(ctx, &cmd_id, &cmd.doc_id, "command has no parsed payload").await?;
            return Ok(());
        }
    };

    let secrets = ctx.load_secrets(&cmd.doc_id).await?.unwrap_or_else(empty_secrets);

    match ctx
        .dispatcher
        .dispatch(&cmd.doc_id, &parsed, &secrets, ctx.config.demo_mode)
        .await
    {
        Ok(outcome) => {
            if let Some(provisioned) = &outcome.provisioned_secrets {
                ctx.store_secrets(&cmd.doc_id, provisioned).await?;
            }
            if outcome.tx_ref.is_some() {
                ctx.repo
                    .set_command_execution_ids(&cmd_id, outcome.tx_ref.as_deref())
                    .await?;
            }

            for (key, value) in &outcome.doc_config_writes {
                ctx.repo.set_doc_config(&cmd.doc_id, key, value).await?;
            }

            let mut result_text = outcome.result_text.clone();
            if let Some(draft) = &outcome.conditional_order {
                let order_id = dw_schemas::new_id("order");
                ctx.repo
                    .insert_conditional_order(&dw_schemas::ConditionalOrder {
                        order_id: order_id.clone(),
                        doc_id: cmd.doc_id.clone(),
                        order_type: draft.order_type,
                        base: draft.base.clone(),
                        quote: draft.quote.clone(),
                        trigger_price: draft.trigger_price,
                        qty: draft.qty,
                        status: dw_schemas::ConditionalOrderStatus::Active,
                        triggered_cmd_id: None,
                    })
                    .await?;
                result_text.push_str(&format!(" [order_id={order_id}]"));
            }
            if let Some(draft) = &outcome.schedule {
                let schedule_id = dw_schemas::new_id("sched");
                let next_run_at = chrono::Utc::now() + chrono::Duration::hours(draft.interval_hours as i64);
                ctx.repo
                    .insert_schedule(&dw_schemas::Schedule {
                        schedule_id: schedule_id.clone(),
                        doc_id: cmd.doc_id.clone(),
                        interval_hours: draft.interval_hours as i32,
                        inner_command_text: draft.inner_command_text.clone(),
                        next_run_at,
                        total_runs: 0,
                        status: dw_schemas::ScheduleStatus::Active,
                    })
                    .await?;
                result_text.push_str(&format!(" [schedule_id={schedule_id}]"));
            }
            if let Some(order_id) = &outcome.cancel_order_id {
                ctx.repo.cancel_conditional_order(order_id).await?;
            }
            if let Some(schedule_id) = &outcome.cancel_schedule_id {
                ctx.repo.cancel_schedule(schedule_id).await?;
            }

            ctx.repo
                .set_command_status(&cmd_id, CommandStatus::Executed, Some(&result_text), None)
                .await?;

            let mut updated = cmd.clone();
            updated.status = CommandStatus::Executed;
            updated.result_text = Some(result_text.clone());
            updated.tx_ref = outcome.tx_ref.clone();
            let url = approval_url(&ctx.config.public_base_url, &cmd.doc_id, &cmd_id);
            ctx.document.write_command_row(&cmd.doc_id, command_row(&updated, url)).await?;

            for line in &outcome.audit_lines {
                audit(ctx, &cmd.doc_id, line.clone()).await?;
            }
            audit(ctx, &cmd.doc_id, format!("{cmd_id} EXECUTED")).await?;
            record_activity(ctx, &cmd.doc_id, "EXECUTED", result_text, outcome.tx_ref).await?;
            Ok(())
        }
        Err(e) => {
            fail(ctx, &cmd_id, &cmd.doc_id, &e.to_string()).await
        }
    }
}

async fn fail(ctx: &TickContext, cmd_id: &str, doc_id: &str, message: &str) -> anyhow::Result<()> {
    ctx.repo
        .set_command_status(cmd_id, CommandStatus::Failed, None, Some(message))
        .await?;
    if let Some(cmd) = ctx.repo.get_command(cmd_id).await? {
        let url = approval_url(&ctx.config.public_base_url, doc_id, cmd_id);
        ctx.document.write_command_row(doc_id, command_row(&cmd, url)).await?;
    }
    audit(ctx, doc_id, format!("{cmd_id} FAILED ({message})")).await?;
    record_activity(ctx, doc_id, "FAILED", message.to_string(), None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_config::{DwConfig, PortConfig, PortTable};
    use dw_dispatcher::{Dispatcher, PortRegistry};
    use dw_document::InMemoryDocumentBackend;
    use dw_ports::PaperChainPort;
    use dw_repo::Repo;
    use dw_schemas::{Command, ParsedCommand};
    use dw_vault::MasterKey;
    use std::collections::BTreeSet;
    use std::sync::Arc as StdArc;
    use std::time::Duration;

    fn test_config() -> Arc<DwConfig> {
        Arc::new(DwConfig {
            master_key: "test".to_string(),
            pinned_doc_id: None,
            name_prefix: None,
            discover_all: true,
            public_base_url: "http://localhost:8080".to_string(),
            http_port: 8080,
            demo_mode: false,
            ports: PortTable {
                chain_a: PortConfig::default(),
                chain_b: PortConfig::default(),
                stablecoin: PortConfig::default(),
                bridge: PortConfig::default(),
                market_data: PortConfig::default(),
                state_channel: PortConfig::default(),
                faucet: PortConfig::default(),
            },
            auto_approve_kinds: BTreeSet::new(),
            executor_batch_size: 5,
            stale_sweep_threshold: Duration::from_secs(3600),
            poll_failure_limit: 10,
            intervals: dw_config::TickIntervals::default(),
            shutdown_drain_timeout: Duration::from_secs(30),
        })
    }

    async fn test_ctx() -> Arc<TickContext> {
        let pool = dw_repo::testkit_db_pool()
            .await
            .expect("DOCWALLET_DATABASE_URL must point at a disposable test database");
        let mut registry = PortRegistry::new();
        registry.chain_a = Some(StdArc::new(PaperChainPort::new("CHAIN_A")));
        let backend = StdArc::new(InMemoryDocumentBackend::new());
        backend.seed_document("doc-1", "Treasury").await;
        Arc::new(TickContext::new(
            Repo::new(pool),
            backend,
            Arc::new(Dispatcher::new(registry)),
            MasterKey::derive("test-key"),
            test_config(),
        ))
    }

    #[tokio::test]
    #[ignore = "requires DOCWALLET_DATABASE_URL"]
    async fn approved_status_command_executes_without_secrets() {
        let ctx = test_ctx().await;
        let now = chrono::Utc::now();
        let cmd = Command {
            cmd_id: "cmd-1".to_string(),
            doc_id: "doc-1".to_string(),
            raw_command: "DW STATUS".to_string(),
            parsed_json: Some(serde_json::to_value(&ParsedCommand::Status).unwrap()),
            status: CommandStatus::Approved,
            tx_ref: None,
            result_text: None,
            error_text: None,
            created_at: now,
            updated_at: now,
        };
        ctx.repo.insert_command(&cmd).await.unwrap();

        run(ctx.clone()).await.unwrap();

        let updated = ctx.repo.get_command("cmd-1").await.unwrap().unwrap();
        assert_eq!(updated.status, CommandStatus::Executed);
    }
}
