use anyhow::bail;
use clap::Parser;
use fake_user_agent::get_chrome_rua;
use nagare::{HttpClient, PluginArgs, PluginRegistry, Resolved, Session};
use nagare_chzzk::Chzzk;
use nagare_oneplusone::OnePlusOne;
use reqwest::ClientBuilder;

#[derive(Parser, Debug, Clone)]
#[clap(name = "nagare", version, about)]
pub struct NagareArgs {
    /// Debug output
    #[clap(long, alias = "debug")]
    verbose: bool,

    /// Plugin argument
    ///
    /// In key=value format. eg. -e chzzk-api-base=http://127.0.0.1:8080
    #[clap(short = 'e', long = "arg")]
    args: Vec<String>,

    /// User agent used to resolve streams
    #[clap(long, env = "NAGARE_USER_AGENT")]
    user_agent: Option<String>,

    /// Cookie sent to the page, can be repeated
    ///
    /// In name=value format. eg. --cookie "sid=xxxx"
    #[clap(long = "cookie")]
    cookies: Vec<String>,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,

    /// List available plugins and exit
    #[clap(long)]
    list_plugins: bool,

    /// Page URL
    #[clap(required_unless_present = "list_plugins")]
    url: Option<String>,
}

impl NagareArgs {
    fn client(&self) -> anyhow::Result<HttpClient> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| get_chrome_rua().to_string());
        Ok(HttpClient::new(ClientBuilder::new().user_agent(user_agent))?)
    }

    fn registry(&self) -> anyhow::Result<PluginRegistry> {
        let args = PluginArgs::from_key_value(&self.args)?;

        let mut registry = PluginRegistry::new();
        registry
            .register(Chzzk::from_args(&args))?
            .register(OnePlusOne::from_args(&args)?)?;
        Ok(registry)
    }
}

async fn print_result(resolved: Resolved, json: bool) -> anyhow::Result<()> {
    let mut streams = Vec::with_capacity(resolved.streams.len());
    for (name, stream) in &resolved.streams {
        streams.push((name.as_str(), stream.kind(), stream.url().await?));
    }

    if json {
        let output = serde_json::json!({
            "plugin": resolved.plugin,
            "metadata": {
                "id": resolved.metadata.id,
                "author": resolved.metadata.author,
                "category": resolved.metadata.category,
                "title": resolved.metadata.title,
            },
            "streams": streams
                .iter()
                .map(|(name, kind, url)| serde_json::json!({
                    "name": name,
                    "type": kind,
                    "url": url.as_str(),
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let metadata = &resolved.metadata;
    println!("[{}] {}", resolved.plugin, metadata.title.as_deref().unwrap_or("-"));
    if let Some(author) = &metadata.author {
        println!("Author: {author}");
    }
    if let Some(category) = &metadata.category {
        println!("Category: {category}");
    }
    for (name, kind, url) in streams {
        println!("{name} ({kind}): {url}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NagareArgs::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let registry = args.registry()?;
    if args.list_plugins {
        for plugin in registry.plugins() {
            println!("{}", plugin.name());
            for line in plugin.help() {
                println!("  {line}");
            }
        }
        return Ok(());
    }

    let Some(url) = &args.url else {
        bail!("No URL given");
    };
    let client = args.client()?;
    if !args.cookies.is_empty() {
        client.add_cookies(args.cookies.clone(), url.as_str())?;
    }

    let session = Session::new(client, registry);
    let Some(resolved) = session.resolve(url).await? else {
        bail!("No plugin can handle {url}");
    };
    if resolved.streams.is_empty() {
        log::error!("No playable streams found on {url}");
        return Ok(());
    }

    print_result(resolved, args.json).await
}
