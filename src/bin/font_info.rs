use std::env;
use std::error::Error;
use std::fs;
use std::process;
use sfnt_outline::{Font, FontError, GlyphId, ParseOptions, num_fonts};

fn usage() -> ! {
    eprintln!("usage: font-info <file> [collection-index]");
    process::exit(2);
}

fn error_kind(e: &FontError) -> &'static str {
    match e {
        FontError::GlyphIndexOutOfRange { .. } => "index out of range",
        FontError::CorruptOutlineData { .. } => "corrupt outline",
        FontError::CompositeCycleDetected { .. } => "composite cycle",
        FontError::CompositeDepthExceeded { .. } => "composite too deep",
        _ => "error",
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| usage());
    let index = match args.next() {
        Some(s) => s.parse().unwrap_or_else(|_| usage()),
        None => 0,
    };

    let data = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("can't read {}: {}", path, e);
            process::exit(1);
        }
    };

    let font = Font::parse_with(&data, ParseOptions::default().with_collection_index(index))?;
    let meta = font.metadata();

    println!("{}: font {} of {}", path, index, num_fonts(&data)?);
    println!("flavor:        {:?}", meta.flavor);
    if let Some(ref family) = meta.names.family {
        println!("family:        {}", family);
    }
    if let Some(ref subfamily) = meta.names.subfamily {
        println!("subfamily:     {}", subfamily);
    }
    println!("units per em:  {}", meta.units_per_em);
    println!("glyphs:        {}", meta.num_glyphs);
    if let (Some(ascent), Some(descent)) = (meta.ascent, meta.descent) {
        println!("ascent:        {}", ascent);
        println!("descent:       {}", descent);
    }
    println!("bbox:          {:?}", meta.bbox);
    println!("loca format:   {:?}", meta.loca_format);
    if let Some(weight) = meta.weight {
        println!("weight:        {}", weight);
    }

    println!();
    println!("tables:");
    for record in font.table_directory().records() {
        let decoded = if font.table(record.tag).is_some() { "decoded" } else { "" };
        println!("  {}  offset {:>8}  length {:>8}  {}", record.tag, record.offset, record.length, decoded);
    }

    println!();
    println!("glyphs:");
    for gid in 0 .. font.num_glyphs() {
        match font.glyph_outline(GlyphId(gid)) {
            Ok(outline) => println!("  {:>5}  {} contours, {} points", gid, outline.contours.len(), outline.num_points()),
            Err(e) => println!("  {:>5}  {}: {}", gid, error_kind(&e), e),
        }
    }

    Ok(())
}
