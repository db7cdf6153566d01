use chrono::Local;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use ledgerbench::client::{ClientError, ClientInstance, ClientOptions};
use ledgerbench::context::{ContextError, ContextExchange};
use ledgerbench::ledger::{ConnectionPool, LedgerAdapter, LedgerError, MemoryLedger};
use ledgerbench::types::{
    AccountSet, ContractSource, Credential, Invocation, StatisticSample, Throughput, Topology, Transfer,
    TxResult, VmKind,
};
use ledgerbench::utils::logging;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Barrier;
use tokio::time::{sleep, Duration};

use crate::config::{Config, ConfigError};
use crate::simulation_results::{RunParameters, SimulationResults};
use crate::stats::SimulatorStats;

/// Blocks to wait for the pending pool to drain after the last VM finished
const DRAIN_WAIT_BLOCKS: u32 = 50;

/// ABI of the key/value contract every run deploys
const KV_STORE_ABI: &str = r#"[{"name":"put","type":"function","inputs":[{"name":"key","type":"string"},{"name":"value","type":"int64"}]}]"#;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Worker task failed: {0}")]
    Worker(String),
    #[error("Failed to write results: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize results: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared inputs of every VM task
struct RunContext {
    config: Config,
    accounts: AccountSet,
    context: String,
    options: ClientOptions,
    progress: ProgressBar,
    /// Every VM observes the account nonce before any VM sends
    ready: Barrier,
}

fn kv_store_source() -> ContractSource {
    ContractSource {
        vm_kind: VmKind::Evm,
        abi_raw: KV_STORE_ABI.to_string(),
        bytecode: b"kv-store".to_vec(),
    }
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} operations ({eta})")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// Creates the key store of the run: `num_accounts` fresh credentials named "0", "1", ...
pub fn create_key_store(ledger: &dyn LedgerAdapter, num_accounts: usize) -> Result<AccountSet, LedgerError> {
    let credentials = (0..num_accounts)
        .map(|_| ledger.new_credential())
        .collect::<Result<Vec<Credential>, _>>()?;
    Ok(AccountSet::from_key_store(credentials))
}

/// Runs one benchmark against `ledger`.
///
/// The coordinator (worker 0, vm 0) deploys the contract and exports its context.
/// Every worker then starts its VMs, each importing the context and issuing its
/// operations. Samples taken around the run feed the throughput window.
pub async fn run_simulation(config: &Config, ledger: Arc<MemoryLedger>) -> Result<SimulationResults, SimulationError> {
    config.validate()?;
    let started_at = Local::now();
    let topology = &config.topology_config;
    logging::log("SIMULATOR", "=== Simulation Configuration ===");
    logging::log("SIMULATOR", &format!("Start Time: {}", started_at.format("%Y-%m-%d %H:%M:%S")));
    logging::log("SIMULATOR", &format!("Ledger: {:?}", config.ledger_config.kind));
    logging::log(
        "SIMULATOR",
        &format!(
            "Workers: {}, VMs per Worker: {}, Engine Capacity: {}",
            topology.worker_count, topology.vms_per_worker, topology.engine_capacity
        ),
    );
    logging::log("SIMULATOR", &format!("Operations per VM: {}", config.transaction_config.ops_per_vm));
    logging::log("SIMULATOR", "=============================");

    let production = ledger.start_block_production();
    let outcome = drive(config, ledger).await;
    production.abort();
    let outcome = outcome?;

    Ok(SimulationResults {
        parameters: RunParameters {
            ledger: config.ledger_config.kind,
            worker_count: topology.worker_count,
            vms_per_worker: topology.vms_per_worker,
            engine_capacity: topology.engine_capacity,
            ops_per_vm: config.transaction_config.ops_per_vm,
            ratio_transfers: config.transaction_config.ratio_transfers,
            confirm: config.transaction_config.confirm,
            block_interval: config.ledger_config.block_interval,
        },
        started_at,
        start: outcome.start,
        end: outcome.end,
        throughput: outcome.throughput,
        stats: outcome.stats,
        connections: outcome.connections,
    })
}

struct RunOutcome {
    start: StatisticSample,
    end: StatisticSample,
    throughput: Throughput,
    stats: SimulatorStats,
    connections: usize,
}

async fn drive(config: &Config, ledger: Arc<MemoryLedger>) -> Result<RunOutcome, SimulationError> {
    let topology = &config.topology_config;
    let accounts = create_key_store(ledger.as_ref(), config.ledger_config.num_accounts)?;
    let adapter: Arc<dyn LedgerAdapter> = ledger.clone();
    let options = config.client_options();

    // Coordinator
    let mut coordinator = ClientInstance::connect(
        Arc::clone(&adapter),
        Topology::new(topology.worker_count, 0, 0, topology.engine_capacity),
        accounts.clone(),
        options.clone(),
    )
    .await?;
    coordinator.deploy_contract(&kv_store_source()).await?;
    let context = coordinator.get_context()?;
    let start = coordinator.log_status().await?;
    logging::log("SIMULATOR", &format!("Contract deployed, starting at height {}", start.height));

    let run = Arc::new(RunContext {
        config: config.clone(),
        accounts,
        context,
        options,
        progress: progress_bar(config.total_operations()),
        ready: Barrier::new((topology.worker_count * topology.vms_per_worker) as usize),
    });
    let workers = (0..topology.worker_count)
        .map(|worker_index| tokio::spawn(run_worker(Arc::clone(&run), Arc::clone(&adapter), worker_index)));
    let outcomes = join_all(workers).await;
    run.progress.finish();

    let mut stats = SimulatorStats::new();
    let mut connections = 0;
    for outcome in outcomes {
        let (worker_stats, worker_connections) = outcome.map_err(|e| SimulationError::Worker(e.to_string()))??;
        stats.merge(&worker_stats);
        connections += worker_connections;
    }

    wait_for_drain(&ledger, config.block_interval()).await;
    // closing block, so half-open windows still cover the last transactions
    ledger.seal_block().await;
    let end = coordinator.log_status().await?;
    let throughput = coordinator.statistic(start, end).await?;

    Ok(RunOutcome {
        start,
        end,
        throughput,
        stats,
        connections,
    })
}

/// Runs every VM of one worker concurrently. Returns the worker's stats and the
/// number of ledger connections it opened.
async fn run_worker(
    run: Arc<RunContext>,
    adapter: Arc<dyn LedgerAdapter>,
    worker_index: u64,
) -> Result<(SimulatorStats, usize), SimulationError> {
    let pool = ConnectionPool::new(run.config.ledger_config.vms_per_connection);
    let vms = (0..run.config.topology_config.vms_per_worker)
        .map(|vm_index| run_vm(&run, &pool, &adapter, worker_index, vm_index));
    let results = join_all(vms).await;

    let mut stats = SimulatorStats::new();
    for vm_results in results {
        for result in vm_results? {
            stats.record(&result);
        }
    }
    logging::log(
        "SIMULATOR",
        &format!("Worker {} finished {} operations ({} failed)", worker_index, stats.total, stats.failure),
    );
    Ok((stats, pool.connection_count().await))
}

async fn run_vm(
    run: &RunContext,
    pool: &ConnectionPool<Arc<dyn LedgerAdapter>>,
    adapter: &Arc<dyn LedgerAdapter>,
    worker_index: u64,
    vm_index: u64,
) -> Result<Vec<TxResult>, SimulationError> {
    let prepared = prepare_client(run, pool, adapter, worker_index, vm_index).await;
    // reached even on failure so the other VMs are not left waiting
    run.ready.wait().await;
    let mut client = prepared?;

    let transactions = &run.config.transaction_config;
    let num_accounts = run.config.ledger_config.num_accounts;
    let mut results = Vec::with_capacity(transactions.ops_per_vm as usize);
    for op in 0..transactions.ops_per_vm {
        let is_transfer = rand::thread_rng().gen_bool(transactions.ratio_transfers);
        let result = if is_transfer {
            let (from, to) = pick_transfer_accounts(num_accounts);
            client
                .transfer(Transfer {
                    from,
                    to,
                    amount: transactions.transfer_amount,
                    extra: String::new(),
                })
                .await
        } else {
            let key = format!("w{}-v{}-{}", worker_index, vm_index, op);
            client.invoke(Invocation::new("put", vec![json!(key), json!(op)])).await
        };
        run.progress.inc(1);
        results.push(result);
    }
    Ok(results)
}

/// Connects a VM's client through its worker's pool and imports the run context.
async fn prepare_client(
    run: &RunContext,
    pool: &ConnectionPool<Arc<dyn LedgerAdapter>>,
    adapter: &Arc<dyn LedgerAdapter>,
    worker_index: u64,
    vm_index: u64,
) -> Result<ClientInstance, SimulationError> {
    let connection = pool
        .get_or_connect(vm_index, || async { Ok::<_, LedgerError>(Arc::clone(adapter)) })
        .await?;
    let topology = Topology::new(
        run.config.topology_config.worker_count,
        worker_index,
        vm_index,
        run.config.topology_config.engine_capacity,
    );
    let mut client = ClientInstance::connect(connection, topology, run.accounts.clone(), run.options.clone()).await?;
    client.set_context(&run.context)?;
    Ok(client)
}

/// Sender and receiver of a transfer. Account "0" signs every invocation, so
/// transfers are sent from the other accounts to keep the two sequence streams apart.
fn pick_transfer_accounts(num_accounts: usize) -> (String, String) {
    let mut rng = rand::thread_rng();
    let from = if num_accounts > 1 { rng.gen_range(1..num_accounts) } else { 0 };
    let to = rng.gen_range(0..num_accounts.max(1));
    (from.to_string(), to.to_string())
}

async fn wait_for_drain(ledger: &MemoryLedger, block_interval: Duration) {
    for _ in 0..DRAIN_WAIT_BLOCKS {
        if ledger.pending_count().await == 0 {
            return;
        }
        sleep(block_interval).await;
    }
    logging::log("SIMULATOR", "Pending pool did not drain, measuring anyway");
}
