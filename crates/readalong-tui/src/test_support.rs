use crate::app::App;
use readalong_core::{Book, Chapter, MemoryStorage, Navigator, NavigatorSettings};

pub fn book(name: &str, chapters: u32) -> Book {
    let mut book = Book::new(name);
    for c in 1..=chapters {
        let chapter: Chapter = (1..=20)
            .map(|v| (v, format!("{name} {c}:{v} and the light")))
            .collect();
        book.insert_chapter(c, chapter);
    }
    book
}

/// Genesis (3 chapters) and Exodus (2), restored to Genesis 1 in a 60x10
/// content area. Speed is never saved.
pub fn test_app() -> App {
    let library = vec![book("Genesis", 3), book("Exodus", 2)].into_iter().collect();
    let mut navigator = Navigator::new(
        library,
        NavigatorSettings::default(),
        Box::new(MemoryStorage::new()),
    );
    navigator.resize(60, 10);
    navigator.restore();
    App::new(navigator, None)
}
