//! Database administration commands

use anyhow::{Context, Result};

use timebank_core::storage::{NewUser, SkillStore, User, UserStore};
use timebank_core::{
    register, rotate_token, Database, ExchangeQuery, ExchangeService, ExchangeStatus, Ledger,
    MarketConfig, SkillFilter,
};

use crate::{ExchangesCommand, SkillsCommand, UserCommand};

const RECENT_TRANSACTIONS: usize = 10;

fn open(config: &MarketConfig) -> Result<Database> {
    let path = config.database_path();
    Database::open(&path, config.busy_timeout())
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

fn find_user(db: &Database, username: &str) -> Result<User> {
    UserStore::new(db.conn())
        .get_by_username(username)?
        .with_context(|| format!("No user named '{}'", username))
}

pub fn user(config: &MarketConfig, command: UserCommand) -> Result<()> {
    let db = open(config)?;
    match command {
        UserCommand::Add {
            username,
            email,
            rate,
        } => {
            let registration = register(
                &db,
                config,
                &NewUser {
                    username,
                    email,
                    hourly_rate: rate,
                },
            )
            .context("Failed to register user")?;
            let user = &registration.user;
            println!("Created {} ({})", user.username, user.id);
            println!("  credits: {}", user.credits);
            println!("  token:   {}", registration.token);
        }
        UserCommand::List => {
            let users = UserStore::new(db.conn()).list()?;
            if users.is_empty() {
                println!("No users");
            }
            for user in users {
                println!(
                    "{}  {:<20} {:>5}cr  {}cr/h",
                    user.id, user.username, user.credits, user.hourly_rate
                );
            }
        }
        UserCommand::Show { username } => {
            let user = find_user(&db, &username)?;
            println!("{} ({})", user.username, user.id);
            println!("  email:       {}", user.email);
            println!("  credits:     {}", user.credits);
            println!("  hourly rate: {}", user.hourly_rate);
            if !user.skills.is_empty() {
                println!("  skills:      {}", user.skills.join(", "));
            }
            for (label, value) in [
                ("bio", &user.bio),
                ("location", &user.location),
                ("availability", &user.availability),
            ] {
                if let Some(value) = value {
                    println!("  {:<13}{}", format!("{}:", label), value);
                }
            }

            let history = Ledger::new(db.conn()).history(&user.id)?;
            if !history.is_empty() {
                println!("  recent movements:");
            }
            for entry in history.iter().take(RECENT_TRANSACTIONS) {
                let sign = if entry.to_user_id.as_deref() == Some(user.id.as_str()) {
                    '+'
                } else {
                    '-'
                };
                println!(
                    "    {}  {}{:<4} {}",
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    sign,
                    entry.amount,
                    entry.reason
                );
            }
        }
        UserCommand::Token { username } => {
            let user = find_user(&db, &username)?;
            let token = rotate_token(&db, &user.id)?;
            println!("New token for {}: {}", user.username, token);
        }
    }
    Ok(())
}

pub fn grant(config: &MarketConfig, username: &str, amount: i64) -> Result<()> {
    let db = open(config)?;
    let user = find_user(&db, username)?;
    db.immediate(|tx| Ledger::new(tx).grant(&user.id, amount))
        .with_context(|| format!("Failed to grant {} credits to {}", amount, username))?;
    let balance = Ledger::new(db.conn()).balance(&user.id)?;
    println!("Granted {} credits to {} (balance {})", amount, username, balance);
    Ok(())
}

pub fn skills(config: &MarketConfig, command: SkillsCommand) -> Result<()> {
    let SkillsCommand::Search {
        search,
        category,
        difficulty,
        provider,
    } = command;

    let filter =
        SkillFilter::from_params(search.as_deref(), category.as_deref(), difficulty.as_deref())?;
    let db = open(config)?;
    let provider_id = match provider {
        Some(username) => Some(find_user(&db, &username)?.id),
        None => None,
    };

    let listed = SkillStore::new(db.conn()).list(provider_id.as_deref())?;
    let matches = filter.apply(&listed);
    if matches.is_empty() {
        println!("No matching skills");
    }
    for skill in matches {
        println!(
            "{}  {:<32} {:<14} {:<12} {}h",
            skill.id,
            skill.title,
            skill.category.as_str(),
            skill.difficulty.as_str(),
            skill.duration
        );
    }
    Ok(())
}

pub fn exchanges(config: &MarketConfig, command: ExchangesCommand) -> Result<()> {
    let ExchangesCommand::List { user, status } = command;

    let db = open(config)?;
    let party = match user {
        Some(username) => Some(find_user(&db, &username)?.id),
        None => None,
    };
    let status = status
        .map(|s| s.parse::<ExchangeStatus>())
        .transpose()?;

    let query = ExchangeQuery {
        party,
        status,
        viewer: None,
    };
    let listed = ExchangeService::new(&db, config).list(&query)?;
    if listed.is_empty() {
        println!("No exchanges");
    }
    for exchange in listed {
        let skill = exchange
            .skill_label
            .as_deref()
            .or(exchange.skill_id.as_deref())
            .unwrap_or("-");
        println!(
            "{}  {:<9} {}h/{}cr  seeker {} -> provider {}  [{}] {}",
            exchange.id,
            exchange.status.as_str(),
            exchange.duration,
            exchange.cost,
            exchange.seeker_id,
            exchange.provider_id,
            exchange.settlement.as_str(),
            skill
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn test_config() -> (MarketConfig, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = MarketConfig {
            database_path: Some(temp_dir.path().join("test.db")),
            starting_credits: 2,
            ..Default::default()
        };
        (config, temp_dir)
    }

    #[test]
    fn test_add_grant_and_show_user() {
        let (config, _temp) = test_config();
        user(
            &config,
            UserCommand::Add {
                username: "ria".to_string(),
                email: "ria@example.com".to_string(),
                rate: None,
            },
        )
        .unwrap();
        grant(&config, "ria", 3).unwrap();

        let db = open(&config).unwrap();
        assert_eq!(find_user(&db, "ria").unwrap().credits, 5);
        user(&config, UserCommand::Show { username: "ria".to_string() }).unwrap();
    }

    #[test]
    fn test_list_users() {
        let (config, _temp) = test_config();
        user(&config, UserCommand::List).unwrap();
        for name in ["sol", "tam"] {
            user(
                &config,
                UserCommand::Add {
                    username: name.to_string(),
                    email: format!("{}@example.com", name),
                    rate: Some(2),
                },
            )
            .unwrap();
        }
        user(&config, UserCommand::List).unwrap();

        let db = open(&config).unwrap();
        let listed = UserStore::new(db.conn()).list().unwrap();
        let names: Vec<&str> = listed.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["sol", "tam"]);
    }

    #[test]
    fn test_duplicate_email_is_reported() {
        let (config, _temp) = test_config();
        let add = |name: &str, email: &str| {
            user(
                &config,
                UserCommand::Add {
                    username: name.to_string(),
                    email: email.to_string(),
                    rate: None,
                },
            )
        };
        add("uri", "uri@example.com").unwrap();
        let err = add("uri2", "URI@example.com").unwrap_err();
        assert!(format!("{:#}", err).contains("already registered"));
    }

    #[test]
    fn test_unknown_user_is_an_error() {
        let (config, _temp) = test_config();
        assert!(grant(&config, "nobody", 1).is_err());
        assert!(exchanges(
            &config,
            ExchangesCommand::List {
                user: Some("nobody".to_string()),
                status: None
            }
        )
        .is_err());
    }

    #[test]
    fn test_bad_filters_are_rejected() {
        let (config, _temp) = test_config();
        assert!(skills(
            &config,
            SkillsCommand::Search {
                search: None,
                category: Some("Gardening".to_string()),
                difficulty: None,
                provider: None
            }
        )
        .is_err());
        assert!(exchanges(
            &config,
            ExchangesCommand::List {
                user: None,
                status: Some("archived".to_string())
            }
        )
        .is_err());
    }
}
