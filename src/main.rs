use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use person_store::config;
use person_store::errors::DbError;
use person_store::models::Person;
use person_store::service::DatabaseService;

const HELP: &str = "Commands:
  -add first_name,last_name,age,email
  -remove <id>
  -list
  -find <pattern>
  -save
  -exit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "person_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::load_config()?;
    let service = DatabaseService::new(&config).await?;
    tracing::info!("Database connection pool established");

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("-exit") {
            break;
        }

        // Command failures print and the loop continues.
        if let Err(e) = dispatch(&service, line).await {
            eprintln!("{}", e);
        }
    }

    service.close().await;
    Ok(())
}

async fn dispatch(service: &DatabaseService, line: &str) -> Result<(), DbError> {
    if let Some(rest) = line.strip_prefix("-add ") {
        add_person(service, rest).await
    } else if let Some(rest) = line.strip_prefix("-remove ") {
        remove_person(service, rest.trim()).await
    } else if line.eq_ignore_ascii_case("-list") {
        list_people(service).await
    } else if let Some(rest) = line.strip_prefix("-find ") {
        find_people(service, rest.trim()).await
    } else if line.eq_ignore_ascii_case("-save") {
        save_roster(service).await
    } else {
        println!("Invalid command.\n{}", HELP);
        Ok(())
    }
}

async fn add_person(service: &DatabaseService, args: &str) -> Result<(), DbError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        println!("Incorrect formatting: -add first_name,last_name,age,email");
        return Ok(());
    }

    let age: i32 = match parts[2].parse() {
        Ok(age) => age,
        Err(_) => {
            println!("Invalid age: {}", parts[2]);
            return Ok(());
        }
    };

    let next_id = service
        .get_all_people()
        .await?
        .iter()
        .map(|p| p.id)
        .max()
        .map_or(1, |max| max + 1);

    let person = Person::new(next_id, parts[0], parts[1], age, parts[3])?;
    service.save_person(&person).await?;
    println!("Added {} {} with id {}", person.first_name, person.last_name, person.id);
    Ok(())
}

async fn remove_person(service: &DatabaseService, arg: &str) -> Result<(), DbError> {
    let id: i64 = match arg.parse() {
        Ok(id) => id,
        Err(_) => {
            println!("Invalid id: {}", arg);
            return Ok(());
        }
    };

    if service.delete_person(id).await? {
        println!("Removed person {} from the population.", id);
    } else {
        println!("No person with id {}.", id);
    }
    Ok(())
}

async fn list_people(service: &DatabaseService) -> Result<(), DbError> {
    let people = service.get_all_people().await?;
    if people.is_empty() {
        println!("No people stored.");
        return Ok(());
    }

    for person in people {
        println!(
            "-------------------\nName: {} {}\nId-Number: {}\nAge: {}\nEmail: {}\n-------------------",
            person.first_name, person.last_name, person.id, person.age, person.email
        );
    }
    Ok(())
}

async fn find_people(service: &DatabaseService, pattern: &str) -> Result<(), DbError> {
    let people = service.find_people_by_name(pattern).await?;
    if people.is_empty() {
        println!("No matches for '{}'.", pattern);
        return Ok(());
    }

    for person in people {
        println!("{}: {} {} <{}>", person.id, person.first_name, person.last_name, person.email);
    }
    Ok(())
}

/// Re-persists the full roster in one transaction.
async fn save_roster(service: &DatabaseService) -> Result<(), DbError> {
    let people = service.get_all_people().await?;
    let count = people.len();
    service.save_people(people).await?;
    println!("Saved {} people.", count);
    Ok(())
}
