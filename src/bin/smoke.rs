// Smoke test: every built-in theme applied to a small page and taken back again

use retro_skin::{
    assets::{MemoryFetcher, ResourceLoader, StaticAssetResolver},
    dom::{tags, Document, MemoryDocument},
    styles::Applicator,
    BuiltinThemes, EngineConfig, RetroTransformer, Settings, ThemeCatalog,
};

fn sample_page() -> Result<MemoryDocument, Box<dyn std::error::Error>> {
    let mut doc = MemoryDocument::new();
    doc.set_location("https://smoke.example/");
    doc.set_title("Smoke")?;
    let body = doc.body().ok_or("page has no body")?;

    let header = doc.append_element(body, "header")?;
    doc.append_element(header, "h1")?;
    let main = doc.append_element(body, "main")?;
    let article = doc.append_element(main, "article")?;
    let paragraph = doc.append_element(article, "p")?;
    doc.set_text(paragraph, "Welcome to my homepage")?;
    let link = doc.append_element(article, "a")?;
    doc.set_attribute(link, "href", "/guestbook")?;
    doc.append_element(body, "footer")?;
    Ok(doc)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🕹️  Testing Retro-Skin Core Functionality");

    let catalog = BuiltinThemes::new();
    let themes = catalog.theme_ids();
    println!("\n1. Themes available: {:?}", themes);
    assert_eq!(themes.len(), 4);

    for (step, theme_id) in themes.iter().enumerate() {
        println!("\n{}. Applying '{}'...", step + 2, theme_id);

        let doc = sample_page()?;
        let nodes_before = doc.connected_count();
        let config = EngineConfig::default();
        let loader = ResourceLoader::new(
            Box::new(StaticAssetResolver::new("assets")),
            Box::new(MemoryFetcher::new()),
            config.assets.retry_delay(),
        );
        let mut engine =
            RetroTransformer::new(doc, Box::new(BuiltinThemes::new()), loader, config)
                .with_settings(Settings::enabled_with_theme(theme_id));

        if !engine.activate().await {
            println!("   ❌ Activation failed");
            return Err(format!("theme '{}' did not activate", theme_id).into());
        }

        let doc = engine.document();
        let root = doc.root().ok_or("page has no root")?;
        println!(
            "   Root theme: {:?}",
            doc.attribute(root, tags::THEME).unwrap_or_default()
        );
        println!("   Tagged nodes: {}", doc.engine_tagged_nodes().len());
        println!(
            "   Cursor applied: {}",
            engine.applicators().cursor.is_applied()
        );

        engine.deactivate();
        let doc = engine.document();
        let leftovers = doc.engine_tagged_nodes().len();
        if leftovers > 0 || doc.connected_count() != nodes_before {
            println!("   ❌ {} node(s) still tagged after deactivation", leftovers);
            return Err(format!("theme '{}' was not fully removed", theme_id).into());
        }
        println!("   ✅ Applied and removed cleanly");
    }

    println!("\n🎉 All themes passed! Retro-Skin core is working.");
    Ok(())
}
