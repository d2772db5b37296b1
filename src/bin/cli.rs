//! Keiba CLI - race card annotations and bet planning from the terminal

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use keiba::config::{BUDGET_STEP, MIN_BUDGET_INPUT, STAKE_STEP};
use keiba::core::{
    build_race_card, build_score_sheet, plan_bets, BetPlan, BetSelection, BetType, Marker,
    PoolSource, PurchaseReceipt, QuinellaMode, Session, SortOrder,
};
use keiba::data::CsvRaceSource;
use keiba::error::{MAX_ADJUSTMENT, MIN_ADJUSTMENT};
use keiba::models::{format_date, COURSES};
use keiba::{AppConfig, Horse, RaceKey, RaceMeta};

const GRADES: [&str; 6] = ["", "G1", "G2", "G3", "OP", "条件"];

#[derive(Parser)]
#[command(name = "keiba")]
#[command(author, version, about = "Horse race betting assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Entry list CSV (overrides KEIBA_DATA_CSV; the sample card is used when neither is set)
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Race date (YYYYMMDD format, default: today)
    #[arg(short, long, global = true)]
    date: Option<u32>,

    /// Racecourse (札幌 函館 福島 新潟 東京 中山 中京 京都 阪神 小倉)
    #[arg(short, long, global = true)]
    course: Option<String>,

    /// Race number (1-12)
    #[arg(short, long, global = true)]
    race: Option<u8>,

    /// Race id as published by the data provider
    #[arg(long, global = true)]
    race_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the race card
    Card {
        /// Sort order: score, odds, popularity or number
        #[arg(short, long, default_value = "score")]
        sort: String,

        /// Which columns to show
        #[arg(short, long, value_enum, default_value_t = CardView::Entries)]
        view: CardView,
    },

    /// List races available in the CSV for a date
    Races,

    /// Generate combinations and stakes
    Combos {
        /// Bet type: win, place, wide, quinella, exacta, trio, trifecta (or 単勝 ... 3連単)
        #[arg(short = 't', long)]
        bet_type: String,

        /// Horses by name or post number, comma separated
        #[arg(long, value_delimiter = ',')]
        horses: Vec<String>,

        /// Total budget in yen (default: KEIBA_DEFAULT_BUDGET)
        #[arg(short, long)]
        budget: Option<i64>,

        /// Stake every combination at zero instead of splitting the budget
        #[arg(long)]
        manual: bool,

        /// Generate each quinella pair once instead of both orders
        #[arg(long)]
        unordered_quinella: bool,

        /// Print a simulated purchase receipt
        #[arg(long)]
        purchase: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CardView {
    /// 出馬表
    Entries,
    /// スコア詳細
    Scores,
    /// 基本情報
    Profile,
    /// 成績
    Form,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Invalid KEIBA_* environment")?;
    if let Some(csv) = &cli.csv {
        config.data_csv = Some(csv.clone());
    }
    init_logging(&config)?;

    println!(
        "{}",
        format!("Keiba CLI v{}", env!("CARGO_PKG_VERSION")).cyan().bold()
    );
    println!();

    let race = race_key(&cli)?;

    if cli.interactive {
        run_interactive(&config, race)?;
    } else if let Some(command) = cli.command {
        match command {
            Commands::Card { sort, view } => {
                let sort: SortOrder = sort.parse()?;
                let session = open_session(&config, race)?;
                print_race_header(&session);
                print_card(&session, sort, view);
            }
            Commands::Races => {
                let date = cli
                    .date
                    .context("--date is required to list races")?;
                list_races(&config, date)?;
            }
            Commands::Combos {
                bet_type,
                horses,
                budget,
                manual,
                unordered_quinella,
                purchase,
            } => {
                let session = open_session(&config, race)?;
                let bet_type: BetType = bet_type.parse()?;
                let selected = resolve_horses(&horses, &session.entries)?;

                let mut selection = BetSelection::new(
                    bet_type,
                    selected,
                    budget.unwrap_or(config.default_budget),
                );
                selection.auto_allocate = !manual;

                let mut generator = config.generator();
                if unordered_quinella {
                    generator.quinella_mode = QuinellaMode::Unordered;
                }

                print_race_header(&session);
                let plan = plan_bets(
                    &selection,
                    &session.entries,
                    &generator,
                    &config.planner_options(),
                )?;
                print_plan(&plan);

                if purchase {
                    print_receipt(&plan.simulate_purchase());
                }
            }
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

/// Logs go to stderr; WARN unless KEIBA_LOG asks for more
fn init_logging(config: &AppConfig) -> Result<()> {
    let level = if std::env::var_os("KEIBA_LOG").is_some() {
        config.level()?
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn race_key(cli: &Cli) -> Result<RaceKey> {
    let today = RaceKey::today()?;
    let key = RaceKey::new(
        cli.date.unwrap_or(today.date),
        cli.course.as_deref().unwrap_or(&today.course),
        cli.race.unwrap_or(today.race_no),
    )?;
    Ok(key.with_race_id(cli.race_id.clone().unwrap_or_default()))
}

fn spinner(message: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    Ok(pb)
}

fn load_entries(config: &AppConfig, race: &RaceKey) -> Result<Vec<Horse>> {
    let source = config.race_source();
    let pb = spinner(format!("Loading {} from {}...", race, source.describe()))?;

    let entries = source
        .fetch_entries(race)
        .with_context(|| format!("Failed to load race {}", race));

    pb.finish_and_clear();
    entries
}

fn open_session(config: &AppConfig, race: RaceKey) -> Result<Session> {
    let entries = load_entries(config, &race)?;
    Ok(Session::new(race, RaceMeta::default(), entries))
}

/// Accept horse names or post numbers
fn resolve_horses(input: &[String], entries: &[Horse]) -> Result<Vec<String>> {
    input
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(h) = entries.iter().find(|h| h.name == s) {
                return Ok(h.name.clone());
            }
            match s.parse::<u8>() {
                Ok(n) => entries
                    .iter()
                    .find(|h| h.number == n)
                    .map(|h| h.name.clone())
                    .with_context(|| format!("No horse with post number {}", n)),
                Err(_) => bail!("Horse not on race card: {}", s),
            }
        })
        .collect()
}

fn list_races(config: &AppConfig, date: u32) -> Result<()> {
    let Some(csv_path) = &config.data_csv else {
        bail!("Listing races needs a CSV (--csv or KEIBA_DATA_CSV)");
    };

    println!(
        "{}: {} ({})",
        "Listing races for".green(),
        date,
        format_date(date)
    );
    println!();

    let pb = spinner("Loading race data...".to_string())?;
    let races = CsvRaceSource::new(csv_path)
        .list_races(date)
        .with_context(|| format!("Failed to list races for {} from {:?}", date, csv_path))?;
    pb.finish_and_clear();

    if races.is_empty() {
        println!("{}", "No races found for this date.".yellow());
        return Ok(());
    }

    // Group by course
    let mut by_course: BTreeMap<usize, (&str, Vec<(u8, usize)>)> = BTreeMap::new();
    for (course, race_no, count) in &races {
        let order = COURSES
            .iter()
            .position(|c| c == course)
            .unwrap_or(COURSES.len());
        by_course
            .entry(order)
            .or_insert_with(|| (course.as_str(), Vec::new()))
            .1
            .push((*race_no, *count));
    }

    println!("{:<8} {:>8} {:>12}", "競馬場", "レース", "出走数");
    println!("{}", "-".repeat(40));

    for (course, races) in by_course.values() {
        let numbers: Vec<String> = races.iter().map(|(r, _)| format!("{}R", r)).collect();
        let total_entries: usize = races.iter().map(|(_, c)| c).sum();
        println!(
            "{:<8} {:>8} {:>12}",
            course,
            races.len(),
            format!("({} entries)", total_entries)
        );
        println!("         {}", numbers.join(" ").dimmed());
    }

    println!();
    println!(
        "Total: {} courses, {} races",
        by_course.len(),
        races.len()
    );

    Ok(())
}

fn print_race_header(session: &Session) {
    let mut title = session.race.label();
    if !session.meta.race_name.is_empty() {
        title = format!("{} {}", title, session.meta.race_name);
    }
    if !session.meta.grade.is_empty() {
        title = format!("{} ({})", title, session.meta.grade);
    }

    println!("{}", title.yellow().bold());
    let mut detail = format_date(session.race.date);
    if !session.meta.post_time.is_empty() {
        detail = format!("{} 発走 {}", detail, session.meta.post_time);
    }
    if let Some(id) = &session.race.race_id {
        detail = format!("{} / race_id {}", detail, id);
    }
    println!("{}", detail.dimmed());
    println!();
}

fn marker_cell(marker: Marker) -> String {
    if marker.is_blank() {
        "-".to_string()
    } else {
        marker.symbol().to_string()
    }
}

fn adjustment_cell(value: i32) -> String {
    match value {
        0 => "0".to_string(),
        v if v > 0 => format!("+{}", v).green().to_string(),
        v => v.to_string().red().to_string(),
    }
}

fn print_card(session: &Session, sort: SortOrder, view: CardView) {
    match view {
        CardView::Entries => print_entries(session, sort),
        CardView::Scores => print_scores(session),
        CardView::Profile => print_profile(session, sort),
        CardView::Form => print_form(session, sort),
    }
}

fn print_entries(session: &Session, sort: SortOrder) {
    let card = build_race_card(&session.entries, &session.annotations, sort, true);

    println!("{} ({})", "出馬表 (Race Card):".yellow().bold(), sort);
    println!(
        "{:>2} {:>2} {:>4} {:<14} {:>4} {:>5} {:>6} {:<12} {:<4} {:>6} {:>4} {:>6}",
        "印", "枠", "馬番", "馬名", "性齢", "斤量", "馬体重", "騎手", "脚質", "オッズ", "人気", "スコア"
    );
    println!("{}", "-".repeat(90));

    for row in &card.rows {
        let line = format!(
            "{:>2} {:>2} {:>4} {:<14} {:>4} {:>5.1} {:>6} {:<12} {:<4} {:>6.1} {:>4} {:>6}",
            marker_cell(row.marker),
            row.frame,
            row.number,
            truncate_name(&row.name, 14),
            row.sex_age,
            row.carried_weight,
            row.body_weight,
            truncate_name(&row.jockey, 12),
            row.running_style,
            row.odds,
            row.popularity,
            row.total_score
        );
        if row.emphasized {
            println!("{}", line.bold());
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
}

fn print_scores(session: &Session) {
    let sheet = build_score_sheet(&session.entries, &session.annotations);

    println!("{}", "スコア詳細 (Score Sheet):".yellow().bold());
    println!(
        "{:<14} {:>4} {:>4} {:>4} {:<12} {:<12} {:<10} {:<8} {:<8}",
        "馬名", "合計", "基本", "手動", "血統", "騎手", "調教師", "成績", "脚質"
    );
    println!("{}", "-".repeat(90));

    for row in &sheet {
        let name = truncate_name(&row.name, 14);
        let name = if row.highlighted {
            name.green().bold()
        } else {
            name.normal()
        };
        println!(
            "{:<14} {:>4} {:>4} {:>4} {:<12} {:<12} {:<10} {:<8} {:<8}",
            name,
            row.total_score,
            row.base_score,
            adjustment_cell(row.manual_adjustment),
            truncate_name(&row.pedigree, 12),
            truncate_name(&row.jockey, 12),
            truncate_name(&row.trainer, 10),
            row.record,
            row.running_style
        );
    }
    println!();
}

fn print_profile(session: &Session, sort: SortOrder) {
    let card = build_race_card(&session.entries, &session.annotations, sort, false);

    println!("{}", "基本情報 (Profile):".yellow().bold());
    println!(
        "{:>4} {:<14} {:>4} {:<12} {:<8} {:<10} {:<12}",
        "馬番", "馬名", "性齢", "血統", "馬主", "生産者", "調教師"
    );
    println!("{}", "-".repeat(80));

    for row in &card.rows {
        let Ok(horse) = session.horse(&row.name) else {
            continue;
        };
        println!(
            "{:>4} {:<14} {:>4} {:<12} {:<8} {:<10} {:<12}",
            horse.number,
            truncate_name(&horse.name, 14),
            horse.sex_age,
            truncate_name(&horse.pedigree, 12),
            truncate_name(&horse.owner, 8),
            truncate_name(&horse.breeder, 10),
            truncate_name(&horse.trainer, 12)
        );
    }
    println!();
}

fn print_form(session: &Session, sort: SortOrder) {
    let card = build_race_card(&session.entries, &session.annotations, sort, false);

    println!("{}", "成績 (Form):".yellow().bold());
    println!(
        "{:>4} {:<14} {:<10} {:<8} {:>8} {:>6} {:>6} {:<4}",
        "馬番", "馬名", "成績", "得意場", "得意距離", "枠適性", "馬場", "脚質"
    );
    println!("{}", "-".repeat(80));

    for row in &card.rows {
        let Ok(horse) = session.horse(&row.name) else {
            continue;
        };
        println!(
            "{:>4} {:<14} {:<10} {:<8} {:>7}m {:>6} {:>6} {:<4}",
            horse.number,
            truncate_name(&horse.name, 14),
            horse.record,
            horse.preferred_course,
            horse.preferred_distance,
            horse.frame_aptitude,
            horse.going_aptitude,
            horse.running_style
        );
    }
    println!();
}

fn print_plan(plan: &BetPlan) {
    println!(
        "{} {}",
        format!("{} 組合せ:", plan.bet_type.label()).yellow().bold(),
        format!("{}点", plan.combination_count)
    );
    if plan.pool_source == PoolSource::TopScore {
        println!(
            "{}",
            format!(
                "(選択頭数が不足しているため、スコア上位{}頭で計算: {})",
                plan.pool.len(),
                plan.pool.join(", ")
            )
            .dimmed()
        );
    }
    println!("{:>4} {:<44} {:>8}", "No", "組合せ", "金額");
    println!("{}", "-".repeat(60));

    for (i, entry) in plan.displayed.iter().enumerate() {
        let stake = format!("¥{}", entry.stake);
        let stake = if entry.stake == 0 {
            stake.dimmed()
        } else {
            stake.normal()
        };
        println!(
            "{:>4} {:<44} {:>8}",
            i + 1,
            truncate_name(&entry.combination.to_string(), 44),
            stake
        );
    }

    if plan.is_truncated() {
        println!(
            "{}",
            format!(
                "... 他 {}点 (表示は先頭{}点まで)",
                plan.combination_count - plan.displayed.len(),
                plan.displayed.len()
            )
            .dimmed()
        );
    }
    println!();

    let summary = &plan.summary;
    println!("予算:     ¥{}", summary.budget);
    println!("合計金額: ¥{}", summary.total_staked);
    if summary.over_budget {
        println!(
            "{}",
            format!("予算超過: ¥{}", -summary.remaining).red().bold()
        );
    } else {
        println!("残り:     ¥{}", summary.remaining);
    }
    println!();
}

fn print_receipt(receipt: &PurchaseReceipt) {
    if receipt.tickets.is_empty() {
        println!("{}", "購入対象の馬券がありません (all stakes are zero).".yellow());
        return;
    }

    println!("{}", "購入シミュレーション (Simulated Purchase):".green().bold());
    for ticket in &receipt.tickets {
        println!(
            "  {} {:<40} ¥{}",
            receipt.bet_type.label(),
            ticket.combination.to_string(),
            ticket.stake
        );
    }
    println!(
        "{} {}点 / ¥{} (予算 ¥{})",
        "→".green(),
        receipt.tickets.len(),
        receipt.total_stake,
        receipt.budget
    );
    println!(
        "{}",
        format!(
            "実際の購入は行われていません ({})",
            receipt.simulated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .dimmed()
    );
    println!();
}

fn run_interactive(config: &AppConfig, race: RaceKey) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!("Choose Quit to exit.\n");

    let theme = ColorfulTheme::default();
    let mut session = open_session(config, race)?;
    print_race_header(&session);

    loop {
        let options = vec![
            "Show race card",
            "Set marker",
            "Set manual adjustment",
            "Plan bets",
            "Change race",
            "Reset annotations",
            "Quit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match selection {
            0 => {
                let sort = SortOrder::ALL[Select::with_theme(&theme)
                    .with_prompt("並び替え")
                    .items(&SortOrder::ALL.map(|s| s.label()))
                    .default(0)
                    .interact()?];
                let views = [
                    (CardView::Entries, "出馬表"),
                    (CardView::Scores, "スコア"),
                    (CardView::Profile, "基本情報"),
                    (CardView::Form, "成績"),
                ];
                let view = views[Select::with_theme(&theme)
                    .with_prompt("表示")
                    .items(&views.map(|(_, label)| label))
                    .default(0)
                    .interact()?]
                .0;

                println!();
                print_card(&session, sort, view);
            }
            1 => {
                let name = select_horse(&theme, &session)?;
                let labels = Marker::ALL.map(|m| {
                    if m.is_blank() {
                        "(なし)"
                    } else {
                        m.symbol()
                    }
                });
                let current = session.annotations.get_annotation(&name).marker;
                let marker = Marker::ALL[Select::with_theme(&theme)
                    .with_prompt(format!("{} の印", name))
                    .items(&labels)
                    .default(Marker::ALL.iter().position(|m| *m == current).unwrap_or(0))
                    .interact()?];

                session.annotations.set_marker(&name, marker);
                session.touch();
                println!("{} {} → {}\n", "✓".green(), name, marker_cell(marker));
            }
            2 => {
                let name = select_horse(&theme, &session)?;
                let current = session.annotations.get_annotation(&name).manual_adjustment;
                let value: i32 = Input::with_theme(&theme)
                    .with_prompt(format!(
                        "{} の手動補正 ({}..{})",
                        name, MIN_ADJUSTMENT, MAX_ADJUSTMENT
                    ))
                    .default(current)
                    .validate_with(|v: &i32| -> Result<(), String> {
                        if (MIN_ADJUSTMENT..=MAX_ADJUSTMENT).contains(v) {
                            Ok(())
                        } else {
                            Err(format!(
                                "must be between {} and {}",
                                MIN_ADJUSTMENT, MAX_ADJUSTMENT
                            ))
                        }
                    })
                    .interact_text()?;

                session.annotations.set_manual_adjustment(&name, value)?;
                session.touch();
                let base = session.horse(&name)?.base_score;
                println!(
                    "{} {} スコア {} → {}\n",
                    "✓".green(),
                    name,
                    base,
                    session.annotations.compute_display_score(&name, base)
                );
            }
            3 => {
                if let Err(e) = plan_interactive(&theme, config, &session) {
                    println!("{} {}\n", "Error:".red().bold(), e);
                }
            }
            4 => {
                let date: u32 = Input::with_theme(&theme)
                    .with_prompt("Date (YYYYMMDD)")
                    .default(session.race.date)
                    .interact_text()?;
                let course_idx = Select::with_theme(&theme)
                    .with_prompt("競馬場")
                    .items(&COURSES)
                    .default(
                        COURSES
                            .iter()
                            .position(|c| *c == session.race.course)
                            .unwrap_or(0),
                    )
                    .interact()?;
                let race_no: u8 = Input::with_theme(&theme)
                    .with_prompt("Race number (1-12)")
                    .default(session.race.race_no)
                    .interact_text()?;
                let race_id: String = Input::with_theme(&theme)
                    .with_prompt("Race id (optional)")
                    .allow_empty(true)
                    .interact_text()?;
                let race_name: String = Input::with_theme(&theme)
                    .with_prompt("レース名 (optional)")
                    .allow_empty(true)
                    .interact_text()?;
                let grade = GRADES[Select::with_theme(&theme)
                    .with_prompt("グレード")
                    .items(&GRADES.map(|g| if g.is_empty() { "(なし)" } else { g }))
                    .default(0)
                    .interact()?];
                let post_time: String = Input::with_theme(&theme)
                    .with_prompt("発走時刻 (optional)")
                    .allow_empty(true)
                    .interact_text()?;

                let key = match RaceKey::new(date, COURSES[course_idx], race_no) {
                    Ok(key) => key.with_race_id(race_id),
                    Err(e) => {
                        println!("{} {}\n", "Error:".red().bold(), e);
                        continue;
                    }
                };

                let source = config.race_source();
                match session.load_race(key, source.as_ref()) {
                    Ok(()) => {
                        session.meta = RaceMeta {
                            race_name,
                            grade: grade.to_string(),
                            post_time,
                        };
                        println!();
                        print_race_header(&session);
                    }
                    Err(e) => println!("{} {}\n", "Error:".red().bold(), e),
                }
            }
            5 => {
                session.reset();
                println!("{} 印と手動補正をリセットしました\n", "✓".green());
            }
            6 => {
                println!("Goodbye!");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

fn select_horse(theme: &ColorfulTheme, session: &Session) -> Result<String> {
    let labels: Vec<String> = session
        .entries
        .iter()
        .map(|h| {
            let annotation = session.annotations.annotation_or_default(&h.name);
            format!(
                "{:>2} {} [{}] {}",
                h.number,
                h.name,
                marker_cell(annotation.marker),
                session.annotations.compute_display_score(&h.name, h.base_score)
            )
        })
        .collect();

    let idx = Select::with_theme(theme)
        .with_prompt("馬を選択")
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(session.entries[idx].name.clone())
}

fn plan_interactive(theme: &ColorfulTheme, config: &AppConfig, session: &Session) -> Result<()> {
    let bet_type = BetType::ALL[Select::with_theme(theme)
        .with_prompt("券種")
        .items(&BetType::ALL.map(|b| b.label()))
        .default(0)
        .interact()?];

    let names: Vec<&str> = session.entries.iter().map(|h| h.name.as_str()).collect();
    let chosen = MultiSelect::with_theme(theme)
        .with_prompt(format!(
            "馬を選択 (space で選択, {}頭未満ならスコア上位{}頭)",
            bet_type.arity(),
            config.fallback_pool
        ))
        .items(&names)
        .interact()?;
    let selected: Vec<String> = chosen.into_iter().map(|i| names[i].to_string()).collect();

    let budget: i64 = Input::with_theme(theme)
        .with_prompt("予算 (円)")
        .default(config.default_budget)
        .validate_with(|v: &i64| -> Result<(), String> {
            if *v >= MIN_BUDGET_INPUT && v % BUDGET_STEP == 0 {
                Ok(())
            } else {
                Err(format!(
                    "must be at least {} in steps of {}",
                    MIN_BUDGET_INPUT, BUDGET_STEP
                ))
            }
        })
        .interact_text()?;

    let auto_allocate = Select::with_theme(theme)
        .with_prompt("金額配分")
        .items(&["自動 (均等)", "手動"])
        .default(0)
        .interact()?
        == 0;

    let mut selection = BetSelection::new(bet_type, selected, budget);
    selection.auto_allocate = auto_allocate;

    println!();
    let mut plan = plan_bets(
        &selection,
        &session.entries,
        &config.generator(),
        &config.planner_options(),
    )?;
    print_plan(&plan);

    loop {
        let action = Select::with_theme(theme)
            .with_prompt("次の操作")
            .items(&["Change a stake", "Simulated purchase", "Back"])
            .default(0)
            .interact()?;

        match action {
            0 => {
                let labels: Vec<String> = plan
                    .displayed
                    .iter()
                    .map(|e| format!("{}  ¥{}", e.combination, e.stake))
                    .collect();
                let idx = Select::with_theme(theme)
                    .with_prompt("組合せ")
                    .items(&labels)
                    .default(0)
                    .interact()?;
                let entry = plan.displayed[idx].clone();

                let stake: i64 = Input::with_theme(theme)
                    .with_prompt(format!("{} の金額", entry.combination))
                    .default(entry.stake)
                    .validate_with(|v: &i64| -> Result<(), String> {
                        if *v >= 0 && v % STAKE_STEP == 0 {
                            Ok(())
                        } else {
                            Err(format!("must be non-negative in steps of {}", STAKE_STEP))
                        }
                    })
                    .interact_text()?;

                plan.apply_override(&entry.combination, stake)?;
                println!();
                print_plan(&plan);
            }
            1 => {
                println!();
                print_receipt(&plan.simulate_purchase());
            }
            _ => break,
        }
    }

    Ok(())
}

fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        name.to_string()
    } else {
        chars[..max_len - 1].iter().collect::<String>() + "…"
    }
}
