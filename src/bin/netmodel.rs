//! 网络拓扑建模命令行
//!
//! `netmodel topology` 按布线标准逐层构建拓扑并输出布线报告；
//! `netmodel cache` 查看/维护设备清单缓存。

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Duration;
use clap::{Args, Parser, Subcommand, ValueEnum};
use netmodel_rs::cache::{CacheError, DeviceRecord, InventoryCache};
use netmodel_rs::config::{DeviceCatalog, Standards, StandardsError};
use netmodel_rs::net::{BuildError, Fabric, FactoryError, Node, NodeId};
use netmodel_rs::report::{CablingReport, ReportError, ReportFormat};
use netmodel_rs::topo::{BuildLog, TopologyBuilder};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "netmodel", about = "数据中心网络拓扑建模：逐层构建 leaf/spine 并生成布线表")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 按布线标准构建拓扑并输出布线报告
    Topology(TopologyArgs),
    /// 设备清单缓存
    Cache(CacheArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

impl From<Format> for ReportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Markdown => ReportFormat::Markdown,
            Format::Json => ReportFormat::Json,
        }
    }
}

#[derive(Debug, Args)]
struct TopologyArgs {
    /// 布线标准文件（.yaml / .yml / .json）
    #[arg(long)]
    standards: PathBuf,

    /// 设备清单缓存；其中 arch_type 可识别的设备会加入最底层
    #[arg(long)]
    inventory: Option<PathBuf>,

    /// 覆盖默认预留端口数
    #[arg(long)]
    reserve_ports: Option<usize>,

    /// 覆盖北向层数上限
    #[arg(long)]
    max_layers: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// 自定义 Tera 模板（仅 markdown）
    #[arg(long)]
    template: Option<PathBuf>,

    /// 输出文件；缺省写到 stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// 把构建决策记录写成 JSON
    #[arg(long)]
    build_log: Option<PathBuf>,

    /// 报告标题；缺省取标准文件中的 meta.name
    #[arg(long)]
    title: Option<String>,
}

#[derive(Debug, Args)]
struct CacheArgs {
    /// 缓存文件（不存在时自动创建）
    #[arg(long)]
    file: PathBuf,

    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Debug, Subcommand)]
enum CacheAction {
    /// 列出全部记录
    List,
    /// 显示一条记录
    Show { ip: String },
    /// 新增或更新一条记录
    Put {
        ip: String,
        #[arg(long)]
        hostname: Option<String>,
        #[arg(long)]
        arch_type: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
    },
    /// 删除一条记录
    Remove { ip: String },
    /// 记录在 max-minutes 之内更新过则退出码为 0，否则为 1
    Fresh {
        ip: String,
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(0..=MAX_FRESH_MINUTES))]
        max_minutes: i64,
    },
}

/// `chrono::Duration` 能表示的最大分钟数
const MAX_FRESH_MINUTES: i64 = i64::MAX / 60_000;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Standards(#[from] StandardsError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("failed to serialize: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to serialize: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn read_file(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 把缓存中类型可识别的设备加入 `fabric`
fn seed_from_inventory(
    cache: &InventoryCache,
    catalog: &mut DeviceCatalog,
    fabric: &mut Fabric,
) -> Result<Vec<NodeId>, FactoryError> {
    let mut seeded = Vec::new();
    for record in cache.records() {
        let Some(arch_type) = record.arch_type.as_deref() else {
            continue;
        };
        if !catalog.contains(arch_type) {
            warn!(ip = %record.ip_address, arch_type, "缓存中的设备类型不在布线标准中，跳过");
            continue;
        }
        let name = record.display_name().to_string();
        let id = fabric.try_add_node(|id| {
            catalog
                .instantiate(id, arch_type, Some(name))
                .map(|d| Box::new(d) as Box<dyn Node>)
        })?;
        seeded.push(id);
    }
    Ok(seeded)
}

fn run_topology(args: TopologyArgs) -> Result<ExitCode, CliError> {
    let standards = Standards::from_path(&args.standards)?;
    let mut opts = standards.topology_opts();
    if let Some(reserve) = args.reserve_ports {
        opts.reserve.default = reserve;
    }
    if let Some(max_layers) = args.max_layers {
        opts.max_layers = max_layers;
    }

    let mut catalog = DeviceCatalog::new(&standards);
    let mut fabric = Fabric::new();
    let mut bottom = catalog.seed_bottom(&standards, &mut fabric)?;
    if let Some(path) = &args.inventory {
        let cache = InventoryCache::open(path)?;
        bottom.extend(seed_from_inventory(&cache, &mut catalog, &mut fabric)?);
    }
    info!(bottom = bottom.len(), "最底层节点就绪");

    let mut builder = TopologyBuilder::new(fabric, bottom, catalog);
    if args.build_log.is_some() {
        builder.log = Some(BuildLog::default());
    }
    let built = builder.create_topology(&opts);
    if let (Some(path), Some(log)) = (&args.build_log, &builder.log) {
        write_file(path, &serde_json::to_string_pretty(&log.events)?)?;
    }
    let topology = built?;
    builder.fabric().verify_links()?;
    builder.assign_ports();

    let title = args
        .title
        .or_else(|| standards.meta.as_ref().and_then(|m| m.name.clone()))
        .unwrap_or_else(|| "Cabling".to_string());
    let report = CablingReport::from_topology(title, builder.fabric(), &topology);
    let template = args.template.as_deref().map(read_file).transpose()?;
    let out = report.render(args.format.into(), template.as_deref())?;

    match &args.output {
        Some(path) => {
            write_file(path, &out)?;
            eprintln!("wrote cabling report to {}", path.display());
        }
        None => print!("{out}"),
    }
    info!(
        layers = topology.layers.len(),
        nodes = topology.node_count(),
        cables = report.rows.len(),
        "完成"
    );
    Ok(ExitCode::SUCCESS)
}

fn run_cache(args: CacheArgs) -> Result<ExitCode, CliError> {
    let mut cache = InventoryCache::open(&args.file)?;
    match args.action {
        CacheAction::List => {
            for r in cache.records() {
                let updated = r
                    .updated_at
                    .map_or_else(|| "-".to_string(), |t| t.to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    r.ip_address,
                    r.hostname.as_deref().unwrap_or("-"),
                    r.arch_type.as_deref().unwrap_or("-"),
                    updated
                );
            }
        }
        CacheAction::Show { ip } => {
            print!("{}", serde_yaml::to_string(cache.get(&ip)?)?);
        }
        CacheAction::Put {
            ip,
            hostname,
            arch_type,
            vendor,
        } => {
            let mut record = DeviceRecord::new(ip.clone());
            record.hostname = hostname;
            record.arch_type = arch_type;
            record.vendor = vendor;
            cache.put(record)?;
            println!("cached {ip}");
        }
        CacheAction::Remove { ip } => {
            cache.remove(&ip)?;
            println!("removed {ip}");
        }
        CacheAction::Fresh { ip, max_minutes } => {
            if cache.is_fresh_within(&ip, Duration::minutes(max_minutes)) {
                println!("fresh");
            } else {
                println!("stale");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // 日志写到 stderr，stdout 只输出报告
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Topology(args) => run_topology(args),
        Command::Cache(args) => run_cache(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
