use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord, UNKNOWN_VERSION};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parser for Maven `pom.xml` files.
///
/// Every `<dependency>` element becomes a package named `groupId:artifactId`,
/// including those under `<dependencyManagement>` and plugin declarations.
/// Children of nested elements such as `<exclusions>` are ignored.
pub struct MavenParser;

#[derive(Default)]
struct DependencyFields {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    scope: Option<String>,
}

impl DependencyFields {
    fn into_record(self) -> Option<PackageRecord> {
        let group_id = self.group_id.filter(|g| !g.is_empty())?;
        let artifact_id = self.artifact_id.filter(|a| !a.is_empty())?;
        let version = self
            .version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

        let record = PackageRecord::new(
            format!("{}:{}", group_id, artifact_id),
            version,
            Ecosystem::Maven,
        );
        Some(match self.scope {
            Some(scope) if !scope.is_empty() => record.with_kind(scope),
            _ => record,
        })
    }
}

impl ManifestParser for MavenParser {
    fn name(&self) -> &'static str {
        "pom.xml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn parse(&self, content: &str) -> ParseResult {
        let mut reader = Reader::from_str(content);
        let mut buf = Vec::new();

        let mut packages = Vec::new();
        let mut saw_element = false;
        let mut open_elements = 0usize;

        // Depth below the current <dependency>; 0 means not inside one.
        let mut dependency_depth = 0usize;
        let mut current = DependencyFields::default();
        let mut current_tag: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    saw_element = true;
                    open_elements += 1;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if dependency_depth > 0 {
                        dependency_depth += 1;
                        current_tag = (dependency_depth == 2).then_some(name);
                    } else if name == "dependency" {
                        dependency_depth = 1;
                        current = DependencyFields::default();
                        current_tag = None;
                    }
                }
                Ok(Event::Empty(_)) => {
                    saw_element = true;
                }
                Ok(Event::End(_)) => {
                    open_elements = open_elements.saturating_sub(1);
                    if dependency_depth == 1 {
                        if let Some(record) = std::mem::take(&mut current).into_record() {
                            packages.push(record);
                        }
                    }
                    dependency_depth = dependency_depth.saturating_sub(1);
                    current_tag = None;
                }
                Ok(Event::Text(t)) => {
                    if let (Some(tag), Ok(text)) = (current_tag.as_deref(), t.unescape()) {
                        let text = text.trim().to_string();
                        match tag {
                            "groupId" => current.group_id = Some(text),
                            "artifactId" => current.artifact_id = Some(text),
                            "version" => current.version = Some(text),
                            "scope" => current.scope = Some(text),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) => {
                    if open_elements > 0 {
                        return ParseResult::from_error("invalid XML: unexpected end of document");
                    }
                    break;
                }
                Err(e) => {
                    return ParseResult::from_error(format!(
                        "invalid XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    ));
                }
                _ => {}
            }
            buf.clear();
        }

        if !saw_element {
            return ParseResult::from_error("invalid XML: no root element");
        }

        ParseResult {
            packages,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <groupId>com.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0.0</version>
  <dependencies>
    <dependency>
      <groupId>org.apache.logging.log4j</groupId>
      <artifactId>log4j-core</artifactId>
      <version>2.14.1</version>
      <exclusions>
        <exclusion>
          <groupId>ignored</groupId>
          <artifactId>ignored</artifactId>
        </exclusion>
      </exclusions>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <scope>test</scope>
    </dependency>
    <dependency>
      <artifactId>missing-group</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn test_parses_dependencies() {
        let result = MavenParser.parse(POM);
        assert!(result.errors.is_empty());
        assert_eq!(result.packages.len(), 2);

        assert_eq!(result.packages[0].name, "org.apache.logging.log4j:log4j-core");
        assert_eq!(result.packages[0].version, "2.14.1");

        assert_eq!(result.packages[1].name, "junit:junit");
        assert_eq!(result.packages[1].version, "unknown");
        assert_eq!(result.packages[1].dependency_kind.as_deref(), Some("test"));
    }

    #[test]
    fn test_project_coordinates_are_not_dependencies() {
        let result = MavenParser.parse(POM);
        assert!(result.packages.iter().all(|p| p.name != "com.example:app"));
    }

    #[test]
    fn test_malformed_xml() {
        let result = MavenParser.parse("<project><dependencies></project>");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_truncated_pom() {
        let truncated = "<project><dependencies><dependency><groupId>a</groupId>\
                         <artifactId>b</artifactId></dependency>";
        let result = MavenParser.parse(truncated);
        assert!(result.packages.is_empty());
        assert_eq!(result.errors, vec!["invalid XML: unexpected end of document".to_string()]);

        let result = MavenParser.parse("<project><dependencies><dependency><groupId>a</groupId>");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_not_xml_at_all() {
        let result = MavenParser.parse("just some words");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
