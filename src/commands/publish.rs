use anyhow::{Context, Result};
use std::sync::Arc;

use newsloom::config::Config;
use newsloom::metrics;
use newsloom::models::PublishResult;
use newsloom::publisher::PlatformPublisher;
use newsloom::scheduler::{PublishEvent, PublishScheduler};

use super::Workspace;

fn print_results(results: &[PublishResult]) {
    for result in results {
        println!("    {result}");
    }
}

fn open_for_publishing(config: Config) -> Result<(Workspace, PlatformPublisher)> {
    let workspace = Workspace::open(config)?;
    if workspace.state.accounts.is_empty() {
        anyhow::bail!("No social accounts configured; add one with `newsloom accounts add-*`");
    }
    let publisher = PlatformPublisher::new(workspace.config.publish_timeout())
        .context("Failed to create publisher")?;
    Ok((workspace, publisher))
}

/// Publish pending posts one per interval until done or interrupted
pub async fn publish(config: Config) -> Result<()> {
    let (mut workspace, publisher) = open_for_publishing(config)?;
    let interval = workspace.config.publish_interval();
    let policy = workspace.config.publish.success_policy;

    let queue = std::mem::take(&mut workspace.state.queue).into_shared();
    let pending = queue.read().await.pending_ids().len();
    metrics::update_queue_pending(pending);
    if pending == 0 {
        println!("No pending posts to publish");
        workspace.state.queue = queue.read().await.clone();
        return Ok(());
    }

    println!(
        "Publishing {pending} post(s) to {} account(s), one every {} minute(s)",
        workspace.state.accounts.len(),
        interval.as_secs() / 60
    );
    println!("Press Ctrl-C to stop");

    let scheduler = PublishScheduler::new(Arc::new(publisher));
    let mut events = scheduler
        .start(queue.clone(), workspace.state.accounts.clone(), interval)
        .await
        .context("Failed to start publishing")?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                println!("\nStopping after the post in progress...");
                scheduler.stop();
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    PublishEvent::Published { post_id, results } => {
                        let status = {
                            let mut guard = queue.write().await;
                            let status = guard.apply_results(post_id, &results, policy);
                            metrics::update_queue_pending(guard.pending().len());
                            status
                        };
                        if let Some(status) = status {
                            metrics::record_post_resolved(status.as_str());
                            println!("Post {post_id}: {status}");
                            print_results(&results);
                        }

                        workspace.state.queue = queue.read().await.clone();
                        workspace.save()?;
                    }
                    PublishEvent::Completed => {
                        println!("All scheduled posts processed");
                    }
                }
            }
        }
    }

    workspace.state.queue = queue.read().await.clone();
    workspace.save()?;
    Ok(())
}

/// Publish every pending post immediately
pub async fn publish_now(config: Config) -> Result<()> {
    let (mut workspace, publisher) = open_for_publishing(config)?;
    let policy = workspace.config.publish.success_policy;

    let queue = std::mem::take(&mut workspace.state.queue).into_shared();
    let scheduler = PublishScheduler::new(Arc::new(publisher)).with_policy(policy);

    let outcome = scheduler
        .publish_now(&queue, &workspace.state.accounts)
        .await
        .context("Immediate publishing failed");

    // Persist whatever was resolved, even on error
    workspace.state.queue = queue.read().await.clone();
    metrics::update_queue_pending(workspace.state.queue.pending().len());
    workspace.save()?;

    let reports = outcome?;
    if reports.is_empty() {
        println!("No pending posts to publish");
    }
    for report in &reports {
        println!("Post {}: {}", report.post_id, report.status);
        print_results(&report.results);
    }
    Ok(())
}
