use std::collections::HashSet;

use news_keyword_harvest::config::{ExtractConfig, HarvestConfig, NormalizerConfig};
use news_keyword_harvest::normalize::segment::LexiconSegmenter;
use news_keyword_harvest::{
    CleanedRecord, CorpusSnapshot, Harvester, KeywordExtractor, KeywordList, KeywordReport,
    MemoryPageSource, Normalizer, SourceRecord,
};
use tempfile::tempdir;

const ARTICLES: &[(&str, &str, &str)] = &[
    ("1", "Kinh doanh", "Giá vàng hôm nay tăng mạnh, thị trường chứng khoán Việt Nam giảm điểm."),
    ("2", "Kinh doanh", "Ngân hàng nhà nước điều chỉnh lãi suất, thị trường chứng khoán hồi phục."),
    ("3", "Kinh doanh", "Xuất khẩu gạo của Việt Nam đạt kỷ lục, giá vàng đi ngang."),
    ("4", "Thể thao", "Đội tuyển Việt Nam thắng đậm trong trận bóng đá giao hữu."),
    ("5", "Thể thao", "Huấn luyện viên công bố danh sách đội tuyển bóng đá dự giải."),
    ("6", "Thể thao", ""),
    ("7", "Thế giới", "Hội nghị thượng đỉnh bàn về biến đổi khí hậu và kinh tế thế giới."),
    ("8", "Thế giới", "!!! ??? ..."),
];

fn normalizer() -> Normalizer {
    let config = NormalizerConfig::default().with_stopwords(["và", "của", "về", "trong", "hôm nay", "đi"]);
    let lexicon = LexiconSegmenter::new(
        [
            "giá vàng",
            "thị trường",
            "chứng khoán",
            "việt nam",
            "ngân hàng",
            "lãi suất",
            "xuất khẩu",
            "đội tuyển",
            "bóng đá",
            "huấn luyện viên",
            "hôm nay",
            "kinh tế",
            "thế giới",
            "biến đổi khí hậu",
        ],
        config.joiner,
    );
    Normalizer::with_segmenter(&config, lexicon)
}

fn cleaned(normalizer: &Normalizer) -> Vec<CleanedRecord> {
    ARTICLES
        .iter()
        .map(|(id, category, text)| normalizer.clean(&SourceRecord::new(*id, *category, *text)))
        .collect()
}

fn assert_well_formed(list: &KeywordList, n: usize) {
    assert!(list.len() <= n);
    let distinct: HashSet<&str> = list.iter().map(|e| e.term.as_str()).collect();
    assert_eq!(distinct.len(), list.len());
    for entry in list.iter() {
        assert!(entry.score > 0.0, "{} has score {}", entry.term, entry.score);
    }
    for pair in list.0.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn normalized_content_keeps_compounds_joined() {
    let normalizer = normalizer();
    let records = cleaned(&normalizer);
    assert_eq!(
        records[0].content,
        "giá_vàng tăng mạnh thị_trường chứng_khoán việt_nam giảm điểm"
    );
    assert_eq!(records[7].content, "");
}

#[test]
fn grouped_lists_are_well_formed() {
    let normalizer = normalizer();
    let records = cleaned(&normalizer);
    let extractor = KeywordExtractor::new(&normalizer, 5000);

    for n in [1, 3, 10, 100] {
        let report = extractor.extract_by_category(&records, n);
        assert_eq!(report.keys().collect::<Vec<_>>(), ["Kinh doanh", "Thế giới", "Thể thao"]);
        for (_, list) in report.iter() {
            assert_well_formed(list, n);
        }
    }

    let report = extractor.extract_by_category(&records, 3);
    let business = report.get("Kinh doanh").unwrap().terms();
    assert!(business.contains(&"thị trường"));
    assert!(business.contains(&"giá vàng"));
    assert!(report.get("Thể thao").unwrap().terms().contains(&"đội tuyển"));
}

#[test]
fn per_document_lists_are_well_formed_and_skip_empty_documents() {
    let normalizer = normalizer();
    let records = cleaned(&normalizer);
    let extractor = KeywordExtractor::new(&normalizer, 5000);

    for batch in [1, 3, 1000] {
        let report = extractor.extract_per_document(&records, 4, batch);
        assert!(!report.contains_key("6"));
        assert!(!report.contains_key("8"));
        assert_eq!(report.len(), 6);
        for (_, list) in report.iter() {
            assert_well_formed(list, 4);
        }
    }
}

#[test]
fn pipeline_from_source_to_artifacts() {
    let dir = tempdir().unwrap();
    let normalizer = normalizer();
    let source_records: Vec<SourceRecord> = ARTICLES
        .iter()
        .map(|(id, category, text)| SourceRecord::new(*id, *category, *text))
        .collect();

    let harvest_config = HarvestConfig {
        state_dir: dir.path().join("batches"),
        page_size: 3,
        flush_threshold: 2,
        ..HarvestConfig::default()
    };
    let harvest = Harvester::new(MemoryPageSource::new(source_records, 3), &normalizer, harvest_config)
        .unwrap()
        .harvest()
        .unwrap();
    let snapshot_path = dir.path().join("all_news.jsonl");
    harvest.corpus.write_jsonl(&snapshot_path).unwrap();

    let corpus = CorpusSnapshot::load_jsonl(&snapshot_path).unwrap();
    assert_eq!(corpus.records, cleaned(&normalizer));

    let config = ExtractConfig::default();
    let report = KeywordExtractor::from_config(&normalizer, &config).extract_by_category(&corpus.records, config.top_n);
    let json_path = dir.path().join("category_keywords.json");
    let cbor_path = dir.path().join("category_keywords.cbor");
    report.save_json(&json_path).unwrap();
    report.save_binary(&cbor_path).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&json_path).unwrap()).unwrap();
    let first = &raw["Kinh doanh"][0];
    assert!(first[0].is_string());
    assert!(first[1].as_f64().unwrap() > 0.0);
    assert_eq!(KeywordReport::load_binary(&cbor_path).unwrap(), report);
}
