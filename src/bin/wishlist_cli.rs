use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use wishlist_api::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db, migrator,
    models::{Item, ItemId, UserId, Wishlist, WishlistId},
    repositories::SeaOrmWishlistRepository,
    services::WishlistService,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    match cli.command {
        Commands::Migrate => {
            migrator::run_migration(config.database_url())
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::IssueToken(args) => issue_token(&config, args, cli.json)?,
        Commands::Wishlists(command) => {
            let context = CliContext::initialize(&config).await?;
            handle_wishlists_command(&context, command, cli.json).await?
        }
        Commands::Items(command) => {
            let context = CliContext::initialize(&config).await?;
            handle_items_command(&context, command, cli.json).await?
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "wishlist", about = "Wishlist CLI for tokens and storage maintenance", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Issue an access token for a user id (development helper)
    IssueToken(IssueTokenArgs),
    /// Inspect and maintain wishlists
    #[command(subcommand)]
    Wishlists(WishlistCommands),
    /// Inspect and book wishlist items
    #[command(subcommand)]
    Items(ItemCommands),
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long)]
    user_id: String,
}

#[derive(Subcommand)]
enum WishlistCommands {
    /// List every wishlist owned by a user
    List {
        #[arg(long)]
        user_id: String,
    },
    /// Show one wishlist
    Show {
        #[arg(long)]
        id: String,
    },
    Archive {
        #[arg(long)]
        id: String,
    },
    Restore {
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// List items of a wishlist
    List {
        #[arg(long)]
        wishlist_id: String,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    Book {
        #[arg(long)]
        item_id: String,
        #[arg(long)]
        user_id: String,
    },
    Unbook {
        #[arg(long)]
        item_id: String,
    },
}

struct CliContext {
    wishlists: WishlistService,
}

impl CliContext {
    async fn initialize(config: &AppConfig) -> Result<Self> {
        let db_pool = db::establish_connection_from_app_config(config)
            .await
            .context("failed to connect to database")?;
        let repository = SeaOrmWishlistRepository::new(Arc::new(db_pool));

        Ok(Self {
            wishlists: WishlistService::new(Arc::new(repository)),
        })
    }
}

fn issue_token(config: &AppConfig, args: IssueTokenArgs, json: bool) -> Result<()> {
    let user_id = UserId::parse(&args.user_id).context("invalid user id")?;
    let auth_service = AuthService::new(AuthConfig::from(config));
    let token = auth_service
        .generate_token(&user_id)
        .context("failed to issue token")?;

    if json {
        print_json(&token)?;
    } else {
        println!("{}", token.access_token);
    }
    Ok(())
}

async fn handle_wishlists_command(
    context: &CliContext,
    command: WishlistCommands,
    json: bool,
) -> Result<()> {
    let service = &context.wishlists;
    match command {
        WishlistCommands::List { user_id } => {
            let user_id = UserId::parse(&user_id).context("invalid user id")?;
            let wishlists = service
                .get_by_user_id(&user_id)
                .await
                .context("failed to list wishlists")?;
            if json {
                print_json(&wishlists)?;
            } else if wishlists.is_empty() {
                println!("No wishlists for user {}", user_id);
            } else {
                wishlists.iter().for_each(render_wishlist);
            }
        }
        WishlistCommands::Show { id } => {
            let wishlist = service
                .get(&parse_wishlist_id(&id)?)
                .await
                .context("failed to load wishlist")?;
            output_wishlist(&wishlist, json)?;
        }
        WishlistCommands::Archive { id } => {
            let wishlist = service
                .archive(&parse_wishlist_id(&id)?)
                .await
                .context("failed to archive wishlist")?;
            output_wishlist(&wishlist, json)?;
        }
        WishlistCommands::Restore { id } => {
            let wishlist = service
                .restore(&parse_wishlist_id(&id)?)
                .await
                .context("failed to restore wishlist")?;
            output_wishlist(&wishlist, json)?;
        }
    }
    Ok(())
}

async fn handle_items_command(context: &CliContext, command: ItemCommands, json: bool) -> Result<()> {
    let service = &context.wishlists;
    match command {
        ItemCommands::List {
            wishlist_id,
            limit,
            offset,
        } => {
            let page = service
                .get_wishlist_items(&parse_wishlist_id(&wishlist_id)?, limit, offset)
                .await
                .context("failed to list items")?;
            if json {
                print_json(&page.items)?;
            } else {
                page.items.iter().for_each(render_item);
                if page.has_more {
                    println!("... more items after offset {}", offset + limit);
                }
            }
        }
        ItemCommands::Book { item_id, user_id } => {
            let item_id = parse_item_id(&item_id)?;
            let user_id = UserId::parse(&user_id).context("invalid user id")?;
            service
                .book_item(&item_id, &user_id)
                .await
                .context("failed to book item")?;
            println!("Item {} booked by {}", item_id, user_id);
        }
        ItemCommands::Unbook { item_id } => {
            let item_id = parse_item_id(&item_id)?;
            let cleared = service
                .unbook_item(&item_id)
                .await
                .context("failed to unbook item")?;
            if cleared {
                println!("Item {} is no longer booked", item_id);
            } else {
                println!("Item {} was not booked", item_id);
            }
        }
    }
    Ok(())
}

fn parse_wishlist_id(raw: &str) -> Result<WishlistId> {
    WishlistId::parse(raw).context("invalid wishlist id")
}

fn parse_item_id(raw: &str) -> Result<ItemId> {
    ItemId::parse(raw).context("invalid item id")
}

fn output_wishlist(wishlist: &Wishlist, json: bool) -> Result<()> {
    if json {
        print_json(wishlist)
    } else {
        render_wishlist(wishlist);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_wishlist(wishlist: &Wishlist) {
    println!(
        "- Wishlist {} • owner {} • \"{}\"{}{}",
        wishlist.id,
        wishlist.user_id,
        wishlist.title,
        if wishlist.is_default { " • default" } else { "" },
        if wishlist.is_archived { " • archived" } else { "" },
    );
}

fn render_item(item: &Item) {
    let booking = match (&item.is_booked_by, item.is_booking_available) {
        (Some(user), _) => format!("booked by {}", user),
        (None, true) => "available".to_string(),
        (None, false) => "not bookable".to_string(),
    };
    println!("- Item {} • \"{}\" • {}", item.id, item.title, booking);
}
