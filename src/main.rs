// ==========================================
// 刀具数据库目录 - 命令行入口
// ==========================================
// 子命令: tools / materials / table / options / promote / export / tool-materials
// 输出: 默认表格（tabled）,--json 输出 JSON 记录
// ==========================================

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tabled::{builder::Builder, settings::Style};

use tool_catalog::api::{ApiError, CatalogSource};
use tool_catalog::domain::{FlattenedView, ToolMaterial};
use tool_catalog::engine::{Selection, SelectionStage};
use tool_catalog::exporter::export_view;
use tool_catalog::{logging, CatalogConfig, CatalogSession, PromotionOutcome};

#[derive(Parser, Debug)]
#[command(name = "tool-catalog", version, about = "刀具数据库目录 - 刀具/材料目录浏览与材料提升")]
struct Cli {
    /// JSON 配置文件
    #[arg(long, global = true, env = "TOOL_CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// 刀具库路径（覆盖配置）
    #[arg(long, global = true)]
    tool_db: Option<PathBuf>,

    /// 材料目录库路径（覆盖配置）
    #[arg(long, global = true)]
    material_db: Option<PathBuf>,

    /// 会话内缓存连接
    #[arg(long, global = true)]
    cache_connections: bool,

    /// 以 JSON 输出结果
    #[arg(long, global = true)]
    json: bool,

    /// 以 JSON 格式输出日志
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 刀具目录（默认为摘要列）
    Tools {
        /// 输出完整连接视图
        #[arg(long)]
        full: bool,
        /// 最多显示行数
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 材料目录视图
    Materials {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 原始表
    Table {
        #[arg(value_enum)]
        source: SourceArg,
        name: String,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// 列出某一选择阶段的可选值
    Options {
        #[arg(value_enum)]
        stage: StageArg,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// 将选中的材料提升到刀具库
    Promote {
        #[command(flatten)]
        selection: SelectionArgs,
        /// 子级材料备注
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// 导出视图为 CSV
    Export {
        #[arg(value_enum)]
        target: ExportTarget,
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
    /// 刀具库 Materials 表
    ToolMaterials,
}

#[derive(Args, Debug)]
struct SelectionArgs {
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    sub_group: Option<String>,
    #[arg(long)]
    quality: Option<String>,
    /// 材料显示标签
    #[arg(long)]
    label: Option<String>,
    /// 同名标签时用 material_id 区分
    #[arg(long)]
    material_id: Option<i64>,
}

impl From<SelectionArgs> for Selection {
    fn from(args: SelectionArgs) -> Self {
        Selection {
            group: args.group,
            sub_group: args.sub_group,
            quality: args.quality,
            material_label: args.label,
            material_id: args.material_id,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Tool,
    Material,
}

impl From<SourceArg> for CatalogSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Tool => CatalogSource::ToolDb,
            SourceArg::Material => CatalogSource::MaterialDb,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    Group,
    SubGroup,
    Quality,
    Material,
}

impl From<StageArg> for SelectionStage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Group => SelectionStage::Group,
            StageArg::SubGroup => SelectionStage::SubGroup,
            StageArg::Quality => SelectionStage::Quality,
            StageArg::Material => SelectionStage::Material,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ExportTarget {
    Tools,
    ToolSummary,
    Materials,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志系统
    if cli.log_json {
        logging::init_json();
    } else {
        logging::init();
    }
    tracing::debug!("{} v{}", tool_catalog::APP_NAME, tool_catalog::VERSION);

    let mut config = CatalogConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    if let Some(path) = cli.tool_db {
        config.tool_db_path = path;
    }
    if let Some(path) = cli.material_db {
        config.material_db_path = path;
    }
    if cli.cache_connections {
        config.cache_connections = true;
    }

    let session = CatalogSession::open(config)?;
    let result = run(&session, cli.command, cli.json);
    session.close();
    result
}

fn run(session: &CatalogSession, command: Command, json: bool) -> Result<()> {
    let api = session.api();

    match command {
        Command::Tools { full, limit } => {
            let view = if full {
                api.get_tool_catalog_view()?
            } else {
                api.get_tool_catalog_summary()?
            };
            print_view(&view, limit, json)
        }
        Command::Materials { limit } => {
            let view = api.get_material_catalog_view()?;
            print_view(&view, limit, json)
        }
        Command::Table {
            source,
            name,
            limit,
        } => {
            let view = api.read_raw_table(source.into(), &name)?;
            print_view(&view, limit, json)
        }
        Command::Options { stage, selection } => {
            let view = api.get_material_catalog_view()?;
            let selection = Selection::from(selection);
            match SelectionStage::from(stage) {
                SelectionStage::Material => {
                    let options = api.list_material_options(&view, &selection)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&options)?);
                    } else {
                        let mut builder = Builder::default();
                        builder.push_record(["label", "material_id"]);
                        for option in &options {
                            builder.push_record([
                                option.label.clone(),
                                option.material_id.map(|id| id.to_string()).unwrap_or_default(),
                            ]);
                        }
                        println!("{}", builder.build().with(Style::psql()));
                    }
                }
                stage => {
                    let options = api.list_options(&view, stage, &selection)?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&options)?);
                    } else {
                        for option in options {
                            println!("{}", option);
                        }
                    }
                }
            }
            Ok(())
        }
        Command::Promote { selection, comment } => {
            let selection = Selection::from(selection);
            let outcome = match api.promote_selection(&selection, &comment) {
                Ok(outcome) => outcome,
                Err(ApiError::AmbiguousSelection {
                    label,
                    material_ids,
                }) => {
                    return Err(anyhow!(
                        "标签 '{}' 对应多个材料 {:?},请用 --material-id 指定",
                        label,
                        material_ids
                    ))
                }
                Err(err) => return Err(err.into()),
            };
            print_outcome(&outcome, json)
        }
        Command::Export { target, output } => {
            let view = match target {
                ExportTarget::Tools => api.get_tool_catalog_view()?,
                ExportTarget::ToolSummary => api.get_tool_catalog_summary()?,
                ExportTarget::Materials => api.get_material_catalog_view()?,
            };
            let rows = export_view(&view, &output)?;
            println!("{} 行已写入 {}", rows, output.display());
            Ok(())
        }
        Command::ToolMaterials => {
            let materials = api.list_tool_materials()?;
            print_materials(&materials, json)
        }
    }
}

fn print_view(view: &FlattenedView, limit: Option<usize>, json: bool) -> Result<()> {
    let shown = limit.unwrap_or(view.row_count()).min(view.row_count());

    if json {
        let records: Vec<_> = view.to_json_records().into_iter().take(shown).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(view.column_names());
    for row in view.rows().iter().take(shown) {
        builder.push_record(row.iter().map(|v| v.to_string()));
    }
    println!("{}", builder.build().with(Style::psql()));
    if shown < view.row_count() {
        println!("({} / {} 行)", shown, view.row_count());
    }
    Ok(())
}

fn print_materials(materials: &[ToolMaterial], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(materials)?);
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["id", "type", "name", "parent_id", "chipping_class", "comment"]);
    for m in materials {
        builder.push_record([
            m.id.to_string(),
            m.material_type.to_string(),
            m.name.clone(),
            m.parent_id.map(|id| id.to_string()).unwrap_or_default(),
            m.chipping_class.map(|c| c.to_string()).unwrap_or_default(),
            m.comment.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", builder.build().with(Style::psql()));
    Ok(())
}

fn print_outcome(outcome: &PromotionOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        PromotionOutcome::Created { id, parent_id } => {
            println!("已创建父级 (id={}) 与子级 (id={})", parent_id, id)
        }
        PromotionOutcome::AttachedAsChild { id, parent_id } => {
            println!("已挂接到父级 (id={}),新子级 id={}", parent_id, id)
        }
        PromotionOutcome::AlreadyExists { name } => println!("材料 '{}' 已存在,未写入", name),
    }
    Ok(())
}
