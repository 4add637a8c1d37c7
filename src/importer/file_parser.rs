// ==========================================
// 检验标本采集目录 - 文件解析器实现
// ==========================================
// 阶段 0: 文本读取与解析
// 支持: CSV（逗号分隔，双引号包裹，"" 转义）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::catalog_importer_trait::FileParser;
use csv::{ReaderBuilder, Trim};

const UTF8_BOM: char = '\u{feff}';

/// 原始数据行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 源文件行号（表头为第 1 行，首个数据行为第 2 行；空白行不计）
    pub line_number: usize,
    pub cells: Vec<String>,
}

/// 原始表格：表头 + 数据行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 空白行：仅有一个单元格且去空白后为空
    fn is_blank(record: &csv::StringRecord) -> bool {
        record.len() == 0 || (record.len() == 1 && record.get(0).map_or(true, str::is_empty))
    }
}

impl FileParser for CsvParser {
    fn parse_text(&self, content: &str) -> ImportResult<RawTable> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let mut table = RawTable::default();
        let mut header_seen = false;

        for result in reader.records() {
            let record = result?;

            // 跳过完全空白的行
            if Self::is_blank(&record) {
                continue;
            }

            let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            if !header_seen {
                table.headers = cells;
                header_seen = true;
                continue;
            }

            table.rows.push(RawRow {
                line_number: table.rows.len() + 2,
                cells,
            });
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_content() {
        let table = CsvParser.parse_text("").unwrap();
        assert!(table.is_empty());

        let table = CsvParser.parse_text("\u{feff}  \n\n").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_strips_bom_from_first_header() {
        let table = CsvParser
            .parse_text("\u{feff}项目ID,项目名称\nLAB000001,血常规")
            .unwrap();
        assert_eq!(table.headers, vec!["项目ID", "项目名称"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].line_number, 2);
    }

    #[test]
    fn test_parse_quoted_fields_and_escaped_quotes() {
        let content = "a,b,c\r\n\"x, y\",\"say \"\"hi\"\"\", plain \n";
        let table = CsvParser.parse_text(content).unwrap();
        assert_eq!(table.rows[0].cells, vec!["x, y", "say \"hi\"", "plain"]);
    }

    #[test]
    fn test_parse_blank_lines_do_not_advance_line_numbers() {
        let content = "a,b\n1,2\n\n   \n3,4\n";
        let table = CsvParser.parse_text(content).unwrap();
        let numbers: Vec<usize> = table.rows.iter().map(|r| r.line_number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn test_parse_ragged_rows() {
        let content = "a,b,c\n1\n1,2,3,4\n";
        let table = CsvParser.parse_text(content).unwrap();
        assert_eq!(table.rows[0].cells, vec!["1"]);
        assert_eq!(table.rows[1].cells.len(), 4);
    }
}
